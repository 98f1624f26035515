pub mod symbol;
pub mod telegram;
pub mod user_state;
pub mod watch;

pub use user_state::{ChatId, ChatTurn, Mode, StoreData, UserState};
pub use watch::{Direction, WatchEntry};
