//! Dispatch table tying verbs to handlers.
//!
//! The interpreter validates each command's fields for its verb and, if
//! they pass, hands typed arguments to the registered handler. Structural
//! failures are answered here; successes only ever come from handlers.
//!
//! A valid command whose verb has no handler is dropped silently, so
//! traffic the application does not expect gets no observable reply.

use crate::{
    command::{Arguments, Command, CommandVerb},
    response::{ErrorDetail, Response},
};

use std::{collections::HashMap, sync::Arc};

use tracing::{debug, instrument, warn};

/// A verb handler: typed arguments plus the original command, which
/// carries the responder and the `verbose_response` flag.
pub type Handler = Arc<dyn Fn(Arguments, Command) + Send + Sync>;

/// Something that registers handlers on an interpreter.
///
/// Configurators are applied in order; a later one may overwrite a verb an
/// earlier one registered.
pub trait InterpreterConfigurator {
    /// Register or replace handlers.
    fn configure_interpreter(&self, interpreter: &mut Interpreter);
}

impl<F> InterpreterConfigurator for F
where
    F: Fn(&mut Interpreter),
{
    fn configure_interpreter(&self, interpreter: &mut Interpreter) {
        self(interpreter)
    }
}

/// Verb to handler mapping.
#[derive(Default)]
pub struct Interpreter {
    handlers: HashMap<CommandVerb, Handler>,
}

impl Interpreter {
    /// An interpreter with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// An interpreter configured by each configurator in turn.
    pub fn with_configurators(configurators: &[&dyn InterpreterConfigurator]) -> Self {
        let mut interpreter = Self::new();
        for configurator in configurators {
            interpreter.configure(*configurator);
        }
        interpreter
    }

    /// Apply one configurator.
    pub fn configure(&mut self, configurator: &dyn InterpreterConfigurator) {
        configurator.configure_interpreter(self);
    }

    /// Register a handler, returning the one it replaces.
    pub fn register<F>(&mut self, verb: CommandVerb, handler: F) -> Option<Handler>
    where
        F: Fn(Arguments, Command) + Send + Sync + 'static,
    {
        debug!(%verb, "Handler registered");
        self.handlers.insert(verb, Arc::new(handler))
    }

    /// Remove a verb's handler so its commands are dropped.
    pub fn unregister(&mut self, verb: CommandVerb) -> Option<Handler> {
        self.handlers.remove(&verb)
    }

    /// Whether a handler is registered for `verb`.
    pub fn is_registered(&self, verb: CommandVerb) -> bool {
        self.handlers.contains_key(&verb)
    }

    /// Dispatch one command.
    ///
    /// Fields are validated before the handler lookup, so a malformed
    /// command is answered even when its verb has no handler.
    #[instrument(skip_all, fields(verb = %command.verb(), client = %command.source()))]
    pub fn handle(&self, command: Command) {
        let arguments = match Arguments::extract(&command) {
            Ok(arguments) => arguments,
            Err(e) => {
                warn!(error = %e, "Command rejected");
                if let Some(detail) = ErrorDetail::structural(&e) {
                    let response = Response::failure(&command, detail, true);
                    command.respond(response);
                }
                return;
            }
        };

        let Some(handler) = self.handlers.get(&command.verb()) else {
            debug!("No handler registered, command dropped");
            return;
        };
        handler(arguments, command);
    }
}
