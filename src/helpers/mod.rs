mod add_piece;
mod generate_post;
mod seal;

pub use self::add_piece::*;
pub use self::generate_post::*;
pub use self::seal::*;
