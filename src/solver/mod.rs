//! Position solving from anchor ranges

pub mod layout;
pub mod trilateration;

pub use layout::AnchorLayout;
pub use trilateration::{
    solve, trilaterate, trilaterate_geometric, Anchor, Method, Point, Position, SolverError,
};
