pub mod columns;
pub mod eda;
pub mod hypothesis;
pub mod io;
pub mod logging;
