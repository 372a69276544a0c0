pub mod anime;
pub mod episode;

pub use anime::{Anime, AnimeRef, Genre, SimpleAnime};
pub use episode::{Episode, Watch};
