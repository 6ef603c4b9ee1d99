//! Serves the recorder's history over HTTP.
//!
//! - `GET /json?from=N&max=M` responds with a page of windows as a JSON array.  `from` defaults to
//! `0` and `max` defaults to `100`.
//! - Any other path responds with a small page that polls `/json` and renders the counters.
use crate::recorder::Recorder;
use hyper::{
    header,
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server, StatusCode,
};
use log::error;
use std::{convert::Infallible, net::SocketAddr, sync::Arc};
use url::form_urlencoded;

const DEFAULT_MAX: usize = 100;

const INDEX: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>statsd-web</title>
</head>
<body>
  <table id="counters"></table>
  <script type="text/javascript">
    var lastIndex = -1;
    var counters = {};

    function render() {
      var rows = "";
      Object.keys(counters).sort().forEach(function(name) {
        rows += "<tr><td>" + name + "</td><td>" + counters[name].join(" ") + "</td></tr>";
      });
      document.getElementById("counters").innerHTML = rows;
    }

    function refresh() {
      var req = new XMLHttpRequest();
      req.open("GET", "/json?max=100&from=" + (lastIndex + 1), true);
      req.onload = function() {
        setTimeout(refresh, 300);
        if (req.status != 200) {
          return;
        }
        JSON.parse(req.responseText).forEach(function(ss) {
          lastIndex = ss.index;
          for (var name in ss.counters) {
            var values = counters[name] || [];
            values.push(ss.counters[name]);
            counters[name] = values.slice(-15);
          }
        });
        render();
      };
      req.send();
    }

    setTimeout(refresh, 500);
  </script>
</body>
</html>
"#;

/// Extracts the `from` and `max` paging parameters from a query string.
///
/// Values are percent-decoded and only the first occurrence of each key counts.  Missing or
/// unparseable values fall back to their defaults.
pub fn parse_page_query(query: Option<&str>) -> (i64, usize) {
    let mut from = None;
    let mut max = None;

    for (key, value) in form_urlencoded::parse(query.unwrap_or("").as_bytes()) {
        match &*key {
            "from" if from.is_none() => from = Some(value),
            "max" if max.is_none() => max = Some(value),
            _ => {},
        }
    }

    (
        from.and_then(|v| v.parse().ok()).unwrap_or(0),
        max.and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_MAX),
    )
}

fn handle(recorder: &Recorder, req: &Request<Body>) -> Response<Body> {
    if req.uri().path() != "/json" {
        return Response::new(Body::from(INDEX));
    }

    let (from, max) = parse_page_query(req.uri().query());
    match recorder.render_json(from, max) {
        Ok(body) => {
            let mut response = Response::new(Body::from(body));
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                header::HeaderValue::from_static("application/json"),
            );
            response
        },
        Err(e) => {
            error!("failed to render snapshots: {}", e);
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        },
    }
}

/// Runs the HTTP server on `address` until it fails.
pub async fn serve(recorder: Arc<Recorder>, address: SocketAddr) -> hyper::Result<()> {
    let make_svc = make_service_fn(move |_| {
        let recorder = recorder.clone();

        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                let recorder = recorder.clone();

                async move { Ok::<_, Infallible>(handle(&recorder, &req)) }
            }))
        }
    });

    Server::try_bind(&address)?.serve(make_svc).await
}
