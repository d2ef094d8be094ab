//! GSGROUPS site backend - binary entry point
//! Delegates to the library for all app logic.

#[tokio::main]
async fn main() {
    gsgroups_backend::run().await;
}
