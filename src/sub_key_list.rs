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

use serde::Serialize;

use crate::cell_key_node::CellKeyNode;
use crate::err::Error;
use crate::file_info::FileInfo;
use crate::sub_key_list_lf::SubKeyListLf;
use crate::sub_key_list_lh::SubKeyListLh;
use crate::sub_key_list_li::SubKeyListLi;
use crate::sub_key_list_ri::SubKeyListRi;

/// The closed set of on-disk subkeys list encodings, decoded once at cell-dispatch
/// time. `Empty` is the canonical list of a key with no subkeys; no cell backs it.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum SubKeyListKind {
    Lf(SubKeyListLf),
    Lh(SubKeyListLh),
    Li(SubKeyListLi),
    Ri(SubKeyListRi),
    Empty,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SubKeyList<'a> {
    #[serde(skip)]
    file_info: &'a FileInfo,
    pub kind: SubKeyListKind,
}

impl<'a> SubKeyList<'a> {
    pub(crate) fn new(file_info: &'a FileInfo, kind: SubKeyListKind) -> Self {
        SubKeyList { file_info, kind }
    }

    pub(crate) fn empty(file_info: &'a FileInfo) -> Self {
        Self::new(file_info, SubKeyListKind::Empty)
    }

    /// Returns a fresh lazy sequence over this list's key records. For a paging
    /// (`ri`) list the sequence is flattened one page at a time, in page order,
    /// skipping empty pages. A corrupt entry pointer ends the sequence early
    /// rather than failing the walk.
    pub fn sub_keys(&self) -> SubKeys<'a> {
        let (current, pages) = match &self.kind {
            SubKeyListKind::Lf(list) => (list.offsets(), Vec::new()),
            SubKeyListKind::Lh(list) => (list.offsets(), Vec::new()),
            SubKeyListKind::Li(list) => (list.offsets(), Vec::new()),
            SubKeyListKind::Ri(list) => (Vec::new(), list.offsets()),
            SubKeyListKind::Empty => (Vec::new(), Vec::new()),
        };
        SubKeys {
            file_info: self.file_info,
            current: current.into_iter(),
            pages: pages.into_iter(),
        }
    }

    /// Case-insensitive linear scan; first match wins. The format guarantees no
    /// sort order usable across all variants, so no ordering is assumed.
    pub fn find_sub_key(&self, name: &str) -> Result<CellKeyNode<'a>, Error> {
        self.sub_keys()
            .find(|key| key.key_name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::not_found(name))
    }
}

/// Two-level lazy walk: `current` drains the key offsets of the active page;
/// `pages` supplies further child lists when the active page is exhausted.
/// Direct lists have exactly one page and no remainder.
pub struct SubKeys<'a> {
    file_info: &'a FileInfo,
    current: std::vec::IntoIter<u32>,
    pages: std::vec::IntoIter<u32>,
}

impl<'a> Iterator for SubKeys<'a> {
    type Item = CellKeyNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(offset) = self.current.next() {
                match self
                    .file_info
                    .cell_at(offset)
                    .and_then(|cell| cell.key_node())
                {
                    Ok(key_node) => return Some(key_node),
                    // a corrupt pointer ends the walk; don't chase the entries behind it
                    Err(_) => return None,
                }
            }
            let page_offset = self.pages.next()?;
            match self
                .file_info
                .cell_at(page_offset)
                .and_then(|cell| cell.sub_key_list())
            {
                Ok(child) => match child.kind {
                    SubKeyListKind::Lf(list) => self.current = list.offsets().into_iter(),
                    SubKeyListKind::Lh(list) => self.current = list.offsets().into_iter(),
                    SubKeyListKind::Li(list) => self.current = list.offsets().into_iter(),
                    // pages must be direct lists; a nested ri is not followed
                    SubKeyListKind::Ri(_) | SubKeyListKind::Empty => continue,
                },
                Err(_) => return None,
            }
        }
    }
}
