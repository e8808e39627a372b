/// Column-name constants for the bikeshare trip schema.
/// Single source of truth - raw CSV headers and derived columns.

// ── Raw trip columns ────────────────────────────────────────────────────────
pub mod trip {
    pub const START_TIME: &str = "Start Time";
    pub const END_TIME: &str = "End Time";
    pub const TRIP_DURATION: &str = "Trip Duration";
    pub const START_STATION: &str = "Start Station";
    pub const END_STATION: &str = "End Station";
    pub const USER_TYPE: &str = "User Type";

    // Present only for some cities; check before access.
    pub const GENDER: &str = "Gender";
    pub const BIRTH_YEAR: &str = "Birth Year";

    pub const MANDATORY: [&str; 5] = [
        START_TIME,
        TRIP_DURATION,
        START_STATION,
        END_STATION,
        USER_TYPE,
    ];
}

// ── Derived columns ─────────────────────────────────────────────────────────
pub mod derived {
    pub const MONTH: &str = "month";
    pub const DAY_OF_WEEK: &str = "day_of_week";
    pub const HOUR: &str = "hour";
}

// ── Source files ────────────────────────────────────────────────────────────
pub mod source {
    pub const CHICAGO_FILE: &str = "chicago.csv";
    pub const NEW_YORK_CITY_FILE: &str = "new_york_city.csv";
    pub const WASHINGTON_FILE: &str = "washington.csv";

    pub const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
}
