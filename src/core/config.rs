use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub db_path: String,
    pub app_origin: String,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_api_hostname: String,
    pub google_oauth_hostname: String,
    pub email_api_key: String,
    pub email_api_hostname: String,
    pub email_from: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let host = "127.0.0.1";
        let port = "2222";
        let storage_path = env::var("SLOTBOOK_STORAGE_PATH").unwrap_or("./".to_string());
        let db_path = format!("{}/db", storage_path);
        let app_origin =
            env::var("SLOTBOOK_APP_ORIGIN").unwrap_or(format!("http://{}:{}", host, port));
        let google_client_id =
            env::var("SLOTBOOK_GOOGLE_CLIENT_ID").expect("Missing SLOTBOOK_GOOGLE_CLIENT_ID");
        let google_client_secret = env::var("SLOTBOOK_GOOGLE_CLIENT_SECRET")
            .expect("Missing SLOTBOOK_GOOGLE_CLIENT_SECRET");
        let google_api_hostname = env::var("SLOTBOOK_GOOGLE_API_HOSTNAME")
            .unwrap_or_else(|_| "https://www.googleapis.com".to_string());
        let google_oauth_hostname = env::var("SLOTBOOK_GOOGLE_OAUTH_HOSTNAME")
            .unwrap_or_else(|_| "https://oauth2.googleapis.com".to_string());
        let email_api_key = env::var("SLOTBOOK_EMAIL_API_KEY").unwrap_or_else(|_| "".to_string());
        let email_api_hostname = env::var("SLOTBOOK_EMAIL_API_HOSTNAME")
            .unwrap_or_else(|_| "https://api.resend.com".to_string());
        let email_from = env::var("SLOTBOOK_EMAIL_FROM")
            .unwrap_or_else(|_| "Slotbook <no-reply@slotbook.local>".to_string());

        Self {
            db_path,
            app_origin,
            google_client_id,
            google_client_secret,
            google_api_hostname,
            google_oauth_hostname,
            email_api_key,
            email_api_hostname,
            email_from,
        }
    }
}
