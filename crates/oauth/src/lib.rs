pub mod callback_server;
pub mod defaults;
pub mod error;
pub mod exchange;
pub mod gateway;
pub mod pkce;
pub mod redirect;
pub mod session;
pub mod storage;
pub mod types;

pub use {
    callback_server::{CallbackServer, callback_value, strip_callback_param},
    defaults::{redirect_url, spotify_config},
    exchange::TokenExchanger,
    gateway::{AuthGateway, Fetched},
    pkce::{generate_challenge, generate_pkce, generate_verifier},
    redirect::{ManualNavigator, Navigator, Redirected, Redirector},
    session::{Bootstrap, Session},
    storage::{FileTokenStore, MemoryTokenStore, TokenKey, TokenStore},
    types::{OAuthConfig, PkceChallenge, TokenResponse},
};

pub use error::{Error, Result};
