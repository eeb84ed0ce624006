pub mod action;
pub mod dispatcher;
pub mod providers;

pub use action::{AlertAction, NotifyError};
pub use dispatcher::dispatch;
pub use providers::{
    create_action, LoggerAction, ScriptAction, StdoutAction, SyslogAction, WebhookAction,
};
