use html2wt::config::SerializerOptions;
use html2wt::error::Error;
use html2wt::{convert, serialize_html};
use std::panic::catch_unwind;

/// Odd or hostile inputs: none of these may panic. Serializing either
/// succeeds or reports bad input.
const INPUTS: &[&str] = &[
    "",
    "<html></html>",
    "<p>",
    "<table><td>x",
    "<table><caption></caption></table>",
    "<ul><ul><ul><li></li></ul></ul></ul>",
    "<dl><dd><table><tr><td>x</td></tr></table></dd></dl>",
    "<li>a<li>b",
    "<b><i>x</b></i>",
    "<b></b><i></i><b>'</b>",
    "<h1></h1><h6>=</h6>",
    "<p data-parsoid='{\"dsr\":[5,2,9,9]}'>inverted</p>",
    "<p data-parsoid='{\"dsr\":[0,1000000,0,0]}'>long</p>",
    "<p data-parsoid='[]'>wrong shape</p>",
    "<span typeof=\"mw:Transclusion\" about=\"#mwt1\">x</span>",
    "<span typeof=\"mw:Transclusion\" about=\"#mwt1\" data-mw='{\"parts\":[{\"template\":{\"target\":{\"wt\":\"t\"},\"params\":{}}}]}'>x</span>",
    "<span typeof=\"mw:Extension/ref\" data-mw='{\"name\":\"ref\"}'></span>",
    "<a rel=\"mw:WikiLink\" href=\"./\"></a>",
    "<a rel=\"mw:WikiLink\" href=\"./%ZZ%\">bad escape</a>",
    "<a rel=\"mw:ExtLink\" href=\"\"></a>",
    "<figure typeof=\"mw:File/Thumb\"><figcaption>no image</figcaption></figure>",
    "<span typeof=\"mw:Image\"><img resource=\"./File:%E2%82%AC.png\" width=\"x\"></span>",
    "<pre>\n\n</pre><pre></pre>",
    "<br><br/><hr><hr>",
    "<meta typeof=\"mw:DiffMarker/deleted\"><p>x</p>",
    "<p>\u{0}\u{feff}\u{202e}</p>",
    "<div><div><div><p>deep</p></div></div></div>",
];

#[test]
fn no_input_panics_in_full_mode() {
    for &body in INPUTS {
        let html = format!("<html><body>{body}</body></html>");
        let result = catch_unwind(|| serialize_html(&html, &SerializerOptions::default()));
        match result {
            Ok(Ok(_)) | Ok(Err(Error::BadInput(_))) => {}
            Ok(Err(e)) => panic!("unexpected error for {body:?}: {e}"),
            Err(_) => panic!("panicked on {body:?}"),
        }
    }
}

#[test]
fn no_input_panics_in_selser_mode() {
    for &body in INPUTS {
        let html = format!("<html><body>{body}</body></html>");
        for src in ["", "x", "{{t}}\n== h ==\n*a"] {
            let result = catch_unwind(|| {
                convert(&html, Some(html.as_str()), Some(src), &SerializerOptions::default())
            });
            match result {
                Ok(Ok(_)) | Ok(Err(Error::BadInput(_))) => {}
                Ok(Err(e)) => panic!("unexpected error for {body:?}: {e}"),
                Err(_) => panic!("panicked on {body:?} with source {src:?}"),
            }
        }
    }
}

#[test]
fn deep_nesting_does_not_overflow() {
    let depth = 40;
    let html = format!(
        "<html><body>{}x{}</body></html>",
        "<ul><li>".repeat(depth),
        "</li></ul>".repeat(depth)
    );
    let out = serialize_html(&html, &SerializerOptions::default()).unwrap();
    assert!(out.wikitext.ends_with('x'));
    assert!(out.wikitext.starts_with(&"*".repeat(depth)));
}
