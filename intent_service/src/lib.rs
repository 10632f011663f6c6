//! Intent service (4.E, sketched): the pure dispatcher sitting between the
//! intent parser and the outside world. Resolves device names, routes
//! calendar/doc intents to their collaborators, and hands creative display
//! requests to the custom-layout pipeline.

mod contracts;
mod device_mapper;
mod dispatcher;

pub use contracts::{CalendarCollaborator, CommandEnvelope, DeviceDispatcher, DispatchResult, IntentResult, ParsedCommand, Parameters};
pub use device_mapper::{clarification_message, resolve, DeviceMatch};
pub use dispatcher::IntentDispatcher;

#[cfg(any(test, feature = "test-util"))]
pub use contracts::mock;
