/*
 * Copyright 2021 Aon Cyber Solutions
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::collections::HashSet;
use std::path::Path;

use nom::Finish;

use crate::base_block::{FileBaseBlock, HiveBins};
use crate::cell_key_node::CellKeyNode;
use crate::err::Error;
use crate::file_info::{FileInfo, ReadSeek};
use crate::sub_key_list::SubKeys;

/* Structures based upon:
    https://github.com/libyal/libregf/blob/main/documentation/Windows%20NT%20Registry%20File%20(REGF)%20format.asciidoc
    https://github.com/msuhanov/regf/blob/master/Windows%20registry%20file%20format%20specification.md#format-of-primary-files
*/
#[derive(Clone, Debug)]
pub struct Parser {
    file_info: FileInfo,
    base_block: FileBaseBlock,
}

impl Parser {
    pub fn from_path(filename: impl AsRef<Path>) -> Result<Self, Error> {
        Self::new(FileInfo::from_path(filename)?)
    }

    pub fn from_read_seek<T: ReadSeek>(data: T) -> Result<Self, Error> {
        Self::new(FileInfo::from_read_seek(data)?)
    }

    pub fn from_vec(buffer: Vec<u8>) -> Result<Self, Error> {
        Self::new(FileInfo::from_vec(buffer))
    }

    fn new(file_info: FileInfo) -> Result<Self, Error> {
        if file_info.buffer.get(0..4) != Some(&b"regf"[..]) {
            return Err(Error::InvalidMagic {
                expected: "regf",
                found: file_info.buffer.get(0..4).unwrap_or_default().to_vec(),
            });
        }
        let (_, base_block) = FileBaseBlock::from_bytes(&file_info.buffer).finish()?;
        Ok(Parser {
            file_info,
            base_block,
        })
    }

    pub fn base_block(&self) -> &FileBaseBlock {
        &self.base_block
    }

    /// Returns a fresh lazy sequence over the hive bins chain.
    pub fn hive_bins(&self) -> HiveBins<'_> {
        self.base_block.hive_bins(&self.file_info)
    }

    /// The key record the hive claims as its root.
    pub fn root_key(&self) -> Result<CellKeyNode<'_>, Error> {
        self.file_info
            .cell_at(self.base_block.root_cell_offset_relative)?
            .key_node()
    }

    /// A depth-first walk over every reachable key, root first. Offsets already
    /// yielded are skipped, so a self-referential subkey graph cannot loop the
    /// traversal.
    pub fn iter(&self) -> KeyIterator<'_> {
        KeyIterator {
            start: self.root_key().ok(),
            stack: Vec::new(),
            visited: HashSet::new(),
        }
    }
}

pub struct KeyIterator<'a> {
    start: Option<CellKeyNode<'a>>,
    stack: Vec<SubKeys<'a>>,
    visited: HashSet<usize>,
}

impl<'a> KeyIterator<'a> {
    fn descend(&mut self, key: &CellKeyNode<'a>) {
        // an unresolvable subkeys list ends that branch, not the whole walk
        if let Ok(sub_key_list) = key.sub_key_list() {
            self.stack.push(sub_key_list.sub_keys());
        }
    }
}

impl<'a> Iterator for KeyIterator<'a> {
    type Item = CellKeyNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(root) = self.start.take() {
            self.visited.insert(root.file_offset_absolute);
            self.descend(&root);
            return Some(root);
        }
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(key) => {
                    if !self.visited.insert(key.file_offset_absolute) {
                        continue;
                    }
                    self.descend(&key);
                    return Some(key);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}
