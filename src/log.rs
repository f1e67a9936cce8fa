use serde::Serialize;
use std::fmt;
use std::io::{BufWriter, Write};

use crate::err::Error;

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Logs {
    logs: Option<Vec<Log>>,
}

impl Logs {
    pub(crate) fn add<T: ToString>(&mut self, code: LogCode, text: &T) {
        self.add_internal(Log {
            code,
            text: text.to_string(),
        });
    }

    fn add_internal(&mut self, warning: Log) {
        match &mut self.logs {
            Some(logs) => logs.push(warning),
            None => self.logs = Some(vec![warning]),
        }
    }

    pub fn get(&self) -> Option<&Vec<Log>> {
        self.logs.as_ref()
    }

    pub(crate) fn get_option(self) -> Option<Self> {
        if self.logs.is_none() {
            None
        } else {
            Some(self)
        }
    }

    pub fn write<W: Write>(&self, output: W) -> Result<(), Error> {
        let mut writer = BufWriter::new(output);
        if let Some(logs) = &self.logs {
            for log in logs {
                writeln!(&mut writer, "{:?} {}", log.code, log.text)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Logs {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.get())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum LogCode {
    WarningOther,
    WarningConversion,
    WarningContent,
    WarningBigDataContent,
    WarningUnrecognizedBitflag,
    WarningIterator,
    WarningParse,
    Info,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Log {
    pub code: LogCode,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logs_add_and_get() {
        let mut logs = Logs::default();
        assert_eq!(None, logs.get());

        logs.add(LogCode::WarningConversion, &"unpaired surrogate");
        let expected = Log {
            code: LogCode::WarningConversion,
            text: "unpaired surrogate".to_string(),
        };
        assert_eq!(&vec![expected], logs.get().unwrap());
    }

    #[test]
    fn test_logs_get_option() {
        let logs = Logs::default();
        assert_eq!(None, logs.get_option());

        let mut logs = Logs::default();
        logs.add(LogCode::Info, &"note");
        assert!(logs.get_option().is_some());
    }
}
