use crate::http::encode::escape_html;

/// Renders `message` into the minimal HTML page sent with every final response.
pub fn create_html_document(message: &str) -> String {
    let body = escape_html(message)
        .replace('\n', "<br>")
        .replace("  ", " &nbsp;");

    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>Error</title>\n\
         </head>\n\
         <body>\n\
         <pre>{body}</pre>\n\
         </body>\n\
         </html>\n"
    )
}
