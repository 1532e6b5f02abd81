pub mod diff;
pub mod order;
pub mod pick;
pub mod snake;
pub mod turn;
