pub mod mal {
    pub const BASIC_FIELDS: &str = "id,title,main_picture,alternative_titles,media_type,rating,average_episode_duration,status,num_episodes";

    pub const FULL_FIELDS: &str = "id,title,main_picture,alternative_titles,start_date,end_date,synopsis,mean,created_at,updated_at,media_type,status,genres,my_list_status,num_episodes,start_season,broadcast,average_episode_duration,rating,related_anime,recommendations,studios";

    pub const RELATED_FIELDS: &str = "media_type,average_episode_duration";

    pub const CLIENT_ID_HEADER: &str = "X-MAL-CLIENT-ID";
}

pub mod headers {
    pub const ACCEPT_API: &str = "application/json, text/javascript, */*; q=0.0";

    pub const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

    pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

    pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36 Edg/138.0.0.0";
}

pub mod cache {
    pub const AIRING_FIRST_PAGE_KEY: &str = "airing:page:1";

    pub const SNAPSHOT_MAX_AGE: &str = "public, max-age=86400";
}

pub mod paths {
    pub const SNAPSHOT_PROXY_PREFIX: &str = "/api/anime/pahe/snapshots/";
}
