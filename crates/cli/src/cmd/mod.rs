mod apply;
mod common;
mod destroy;
mod diff;
mod events;
mod show;
mod status;
mod update;
mod validate;

pub use apply::{cmd_apply, cmd_create, cmd_recreate};
pub use common::{Globals, TemplateArgs};
pub use destroy::cmd_delete;
pub use diff::cmd_diff;
pub use events::cmd_events;
pub use show::cmd_show;
pub use status::{cmd_outputs, cmd_status};
pub use update::cmd_update;
pub use validate::cmd_validate;
