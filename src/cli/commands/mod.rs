mod anime;
mod episode;
mod latest;
mod search;

pub use anime::cmd_anime_info;
pub use episode::cmd_episode;
pub use latest::cmd_latest;
pub use search::cmd_search_anime;
