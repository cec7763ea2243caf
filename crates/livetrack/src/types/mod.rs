mod leader_id;
mod score;
mod side;

pub use leader_id::LeaderId;
pub use score::Score;
pub use side::Side;
