//! Route parsing for the navigation surface. Detail ids are validated
//! against the national dex range; anything unmatched falls through to
//! not-found.

pub const MIN_ID: u16 = 1;
pub const MAX_ID: u16 = 1010;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Home,
    Detail(u16),
    Team,
    Favourites,
    NotFound,
}

pub fn valid_id(id: u16) -> bool {
    (MIN_ID..=MAX_ID).contains(&id)
}

impl Route {
    pub fn parse(path: &str) -> Self {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Route::Home,
            ["pokemon", raw_id] => match raw_id.parse::<u16>() {
                Ok(id) if valid_id(id) => Route::Detail(id),
                _ => Route::NotFound,
            },
            ["team"] => Route::Team,
            ["favourites"] => Route::Favourites,
            _ => Route::NotFound,
        }
    }
}
