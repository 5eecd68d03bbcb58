mod arguments;
#[allow(clippy::module_inception)]
mod command;
pub(crate) mod field;
mod verb;

pub use {
    arguments::Arguments,
    command::{Command, DEFAULT_RATE, Responder},
    field::Field,
    verb::CommandVerb,
};
