#![forbid(unsafe_code)]

mod delete;
mod fork;
mod lineage;
mod list;
mod update;
mod visibility;
mod votes;
