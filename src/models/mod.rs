//! Domain records for the league and the shop.

mod cart;
mod coupon;
mod ids;
mod item;
mod match_record;
mod player;
mod sale;
mod team;
mod user;

pub use cart::*;
pub use coupon::*;
pub use ids::*;
pub use item::*;
pub use match_record::*;
pub use player::*;
pub use sale::*;
pub use team::*;
pub use user::*;
