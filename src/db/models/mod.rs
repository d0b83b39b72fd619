pub mod calendar_day;
pub mod reading;

pub use calendar_day::{CalendarDay, InvalidDate};
pub use reading::{Reading, StoreRow};
