//! SeaORM entity models
//!
//! Database entities for the Encore catalog

mod artist;
mod person;
mod rating;

pub use artist::{
    Entity as ArtistEntity,
    Model as Artist,
    ActiveModel as ArtistActiveModel,
    Column as ArtistColumn,
};

pub use person::{
    Entity as PersonEntity,
    Model as Person,
    ActiveModel as PersonActiveModel,
    Column as PersonColumn,
};

pub use rating::{
    Entity as RatingEntity,
    Model as Rating,
    ActiveModel as RatingActiveModel,
    Column as RatingColumn,
};
