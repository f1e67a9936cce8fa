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

pub mod base_block;
pub mod byte_view;
pub mod cell;
pub mod cell_big_data;
pub mod cell_key_node;
pub mod cell_key_value;
pub mod cell_value;
pub mod err;
pub mod file_info;
pub mod hive_bin;
pub mod log;
pub(crate) mod macros;
pub mod parser;
pub mod sub_key_list;
pub mod sub_key_list_lf;
pub mod sub_key_list_lh;
pub mod sub_key_list_li;
pub mod sub_key_list_ri;
pub mod util;
pub mod value_list;
