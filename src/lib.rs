//! Authentication and authorization for a JSON web API: signup, login,
//! signed session tokens, route protection, role restriction and password
//! reset by email.

pub mod config;
pub mod error;
pub mod state;
pub mod db;
pub mod routes;

pub mod crypto {
    pub mod password;
    pub mod reset;
    pub mod token;
}

pub mod models {
    pub mod user;
}

pub mod repositories {
    pub mod memory;
    pub mod user;
}

pub mod services {
    pub mod auth;
    pub mod mail;
}

pub mod handlers {
    pub mod auth;
    pub mod users;
}

pub mod middleware_layer {
    pub mod auth;
    pub mod roles;
}

pub mod validation {
    pub mod auth;
}
