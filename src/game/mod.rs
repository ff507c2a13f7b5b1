pub mod chart;
pub mod hold;
pub mod judge;
pub mod judgment;
pub mod projection;
pub mod score;
pub mod session;
