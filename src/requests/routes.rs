//! API routes, relative to [`MangoClient::BASE_URL`](crate::MangoClient::BASE_URL)

pub const PING: &str = "/ping";

pub const LOGIN: &str = "/auth/login";
pub const LOGOUT: &str = "/auth/logout";
pub const REFRESH: &str = "/auth/refresh";

pub const MANGA: &str = "/manga";
pub const RANDOM_MANGA: &str = "/manga/random";
pub const TAGS: &str = "/manga/tag";
pub const CHAPTER: &str = "/chapter";
pub const GROUP: &str = "/group";
pub const USER: &str = "/user";
pub const AUTHOR: &str = "/author";
pub const FOLLOWED_MANGA: &str = "/user/follows/manga";
pub const FOLLOWED_MANGA_FEED: &str = "/user/follows/manga/feed";
pub const LIST: &str = "/list";
pub const AT_HOME: &str = "/at-home/server";

pub fn manga(id: &str) -> String {
    format!("{MANGA}/{id}")
}

pub fn manga_feed(id: &str) -> String {
    format!("{MANGA}/{id}/feed")
}

pub fn manga_aggregate(id: &str) -> String {
    format!("{MANGA}/{id}/aggregate")
}

pub fn chapter(id: &str) -> String {
    format!("{CHAPTER}/{id}")
}

pub fn group(id: &str) -> String {
    format!("{GROUP}/{id}")
}

pub fn user(id: &str) -> String {
    format!("{USER}/{id}")
}

pub fn author(id: &str) -> String {
    format!("{AUTHOR}/{id}")
}

pub fn list(id: &str) -> String {
    format!("{LIST}/{id}")
}

pub fn at_home(chapter_id: &str) -> String {
    format!("{AT_HOME}/{chapter_id}")
}
