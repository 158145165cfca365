pub mod dispatcher;
pub mod session;
pub mod state;
pub mod tabs;

pub use dispatcher::{Dispatcher, MessageHandler, Routed, TabLog};
pub use session::{
    session, Command, Notification, PlotSnapshot, Session, SessionEnd, SessionHandle,
};
pub use state::ConnectionState;
pub use tabs::{PlotTab, TabFrame, TabRegistry};
