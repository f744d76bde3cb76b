pub mod dispatcher;
pub mod handlers;
pub mod response;

pub use dispatcher::{CommandDispatcher, CommandKind, CommandSpec, Tokens, COMMAND_TABLE};
pub use handlers::DeviceState;
pub use response::ResponseBuffer;
