#![doc = include_str!("../README.md")]

pub mod ast;
pub mod errors;
pub mod formats;
pub mod names;
pub mod parser;
pub mod references;
pub mod registry;

pub use errors::ParseError;
pub use names::NameMap;
pub use parser::{canonical_name, parse_ets, parse_predicate, parse_sts, parse_temporal};
pub use references::resolve_reference;
pub use registry::{
    get_file_flags, parse_model_list, ModelError, ModelParser, ModelRef, ParseContext,
    ParsedModel, ParserRegistry,
};
