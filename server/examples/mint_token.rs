use rv_server::auth::jwt;
use uuid::Uuid;

/// Mints a bearer token for local API testing:
/// `cargo run --example mint_token <user-uuid> [secret]`
fn main() {
    let user_id: Uuid = std::env::args()
        .nth(1)
        .expect("Usage: mint_token <user-uuid> [secret]")
        .parse()
        .expect("First argument must be a UUID");
    let secret = std::env::args()
        .nth(2)
        .or_else(|| std::env::var("JWT_SECRET").ok())
        .expect("Pass a secret or set JWT_SECRET");

    let token = jwt::generate_access_token(user_id, &secret, 3600)
        .expect("Failed to generate token");
    println!("{token}");
}
