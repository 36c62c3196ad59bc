//! Core contracts for tabgen.
//!
//! This crate holds the schema-agnostic validator framework that the
//! specification rule set is built on. It knows nothing about JSON or
//! tables: a rule set plugs its own document, schema, item and error types
//! in through [`ContextFamily`].

pub mod validator;

pub use validator::{
    Check, CheckFn, ContextFamily, ContextProducer, GlobalContext, ItemIter, ProduceFn, Validator,
    collect, compose, group_by_context, run,
};
