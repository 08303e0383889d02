pub mod error;
pub mod manager;
pub mod scheduler;
pub mod table_actor;

pub use error::TableError;
pub use manager::TableRegistry;
pub use scheduler::{Scheduler, TimerHandle, TokioScheduler};
pub use table_actor::{
    spawn_table, ChannelSink, EventSink, LeaveReply, NullSink, TableActor, TableCommand,
    TableContext, TableHandle,
};
