use std::env;

// 1..=99 are internal faults, 100.. are caller faults.
pub const ENV_VAR: i32 = 1;
pub const REQWEST: i32 = 3;
pub const UPSTREAM: i32 = 4;

pub const INVALID_TRANSITION: i32 = 100;
pub const INVALID_INPUT: i32 = 101;
pub const UNAUTHORIZED: i32 = 102;
pub const INVALID_COORDINATE: i32 = 103;
pub const UNKNOWN_VEHICLE_CLASS: i32 = 104;
pub const UNSUPPORTED_CURRENCY: i32 = 105;
pub const DATA_CONSISTENCY: i32 = 106;
pub const CONFLICT: i32 = 107;

#[derive(Debug)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        env_var_error(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        reqwest_error(err)
    }
}

pub fn invalid_transition_error(from: &str, to: &str) -> Error {
    Error {
        code: INVALID_TRANSITION,
        message: format!("invalid status transition from {} to {}", from, to),
    }
}

pub fn invalid_input_error() -> Error {
    Error {
        code: INVALID_INPUT,
        message: "invalid input".into(),
    }
}

pub fn unauthorized_error() -> Error {
    Error {
        code: UNAUTHORIZED,
        message: "unauthorized".into(),
    }
}

pub fn invalid_coordinate_error(latitude: f64, longitude: f64) -> Error {
    Error {
        code: INVALID_COORDINATE,
        message: format!("coordinate out of range: ({}, {})", latitude, longitude),
    }
}

pub fn unknown_vehicle_class_error(class: &str) -> Error {
    Error {
        code: UNKNOWN_VEHICLE_CLASS,
        message: format!("unknown vehicle class: {}", class),
    }
}

pub fn unsupported_currency_error(from: &str, to: &str) -> Error {
    Error {
        code: UNSUPPORTED_CURRENCY,
        message: format!("unsupported currency conversion: {} to {}", from, to),
    }
}

pub fn data_consistency_error(message: &str) -> Error {
    Error {
        code: DATA_CONSISTENCY,
        message: message.into(),
    }
}

pub fn conflict_error() -> Error {
    Error {
        code: CONFLICT,
        message: "stale ride version".into(),
    }
}

pub fn env_var_error(_: env::VarError) -> Error {
    Error {
        code: ENV_VAR,
        message: "environment variable error".into(),
    }
}

pub fn reqwest_error(_: reqwest::Error) -> Error {
    Error {
        code: REQWEST,
        message: "reqwest error".into(),
    }
}

pub fn upstream_error() -> Error {
    Error {
        code: UPSTREAM,
        message: "upstream error".into(),
    }
}
