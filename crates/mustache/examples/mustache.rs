use serde_json::json;
use trillium::Conn;
use trillium_cookies::CookiesHandler;
use trillium_mustache::{
    FlashConnExt, FlashHandler, Messages, MustacheConfig, MustacheConnExt, MustacheHandler,
};

fn main() {
    env_logger::init();

    let config = MustacheConfig::from_env()
        .expect("invalid mustache configuration")
        .with_root("examples")
        .with_languages(["en", "de"]);

    let messages = Messages::from_dir("examples/messages").expect("could not load messages");

    trillium_smol::run((
        CookiesHandler::new(),
        FlashHandler::new(),
        MustacheHandler::new(config).with_messages(messages),
        |conn: Conn| async move {
            match conn.path() {
                "/publish" => conn
                    .with_flash("success", "flash.published")
                    .with_status(303)
                    .with_response_header("location", "/")
                    .halt(),
                _ => conn
                    .with_controller("posts", "index")
                    .assign(
                        "posts",
                        [json!({ "title": "hello world" }), json!({ "title": "mustache on trillium" })],
                    )
                    .render_default(),
            }
        },
    ));
}
