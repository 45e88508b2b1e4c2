//! Chart page rendering
//!
//! The page carries no charting library: it opens the chart socket, requests
//! the snapshot, polls for deltas and re-dispatches both as `chartsync` DOM
//! events on the canvas so any renderer can be attached.

use serde_json::Value;

use crate::models::ChartType;
use crate::utils::names::chart_id;

/// Seconds between `update_chart` polls
pub const POLL_INTERVAL_SECS: u64 = 30;

pub struct ChartPage<'a> {
    pub names: &'a [String],
    pub chart_type: ChartType,
    pub ws_path: &'a str,
    pub secret: &'a str,
}

impl ChartPage<'_> {
    /// Canvas and script only, for embedding in an existing page
    pub fn body(&self) -> String {
        let id = chart_id(self.names);
        let names: Vec<Value> = self.names.iter().cloned().map(Value::String).collect();

        format!(
            r#"<div class="chartsync">
<canvas id="{id_attr}"></canvas>
<script>
(function () {{
  const canvas = document.getElementById({id_js});
  const names = {names_js};
  const chartType = {type_js};
  const latest = {{}};
  const pending = {{}};
  let nextId = 0;
  const scheme = window.location.protocol === "https:" ? "wss://" : "ws://";
  const socket = new WebSocket(scheme + window.location.host + {ws_js});

  function emit(detail) {{
    canvas.dispatchEvent(new CustomEvent("chartsync", {{ detail: detail }}));
  }}

  function call(action, args, onResponse) {{
    const requestId = "req-" + (nextId++);
    pending[requestId] = onResponse;
    socket.send(JSON.stringify({{ ws_action: {{
      type: "request",
      response_expected: true,
      request: {{ action: action, args: args, kwargs: {{}} }},
      request_id: requestId
    }} }}));
  }}

  socket.addEventListener("open", function () {{
    socket.send(JSON.stringify({{ setup: {secret_js} }}));
    call("create_chart", [names, chartType], function (chart) {{
      if (chart.error) {{ emit(chart); return; }}
      chart.datasets.forEach(function (d) {{ latest[d.name] = d.latest_timestamp; }});
      emit(chart);
      setInterval(function () {{
        names.forEach(function (name) {{
          call("update_chart", [name, latest[name]], function (delta) {{
            if (delta.action !== "update_chart") return;
            latest[name] = delta.latest_timestamp;
            emit(delta);
          }});
        }});
      }}, {poll_ms});
    }});
  }});

  socket.addEventListener("message", function (event) {{
    const frame = JSON.parse(event.data);
    const body = frame.ws_action;
    if (!body || body.type !== "response") return;
    const handler = pending[body.request_id];
    delete pending[body.request_id];
    if (handler) handler(body.response);
  }});
}})();
</script>
</div>"#,
            id_attr = escape_html(&id),
            id_js = script_literal(&Value::String(id.clone())),
            names_js = script_literal(&Value::Array(names)),
            type_js = script_literal(&Value::String(self.chart_type.to_string())),
            ws_js = script_literal(&Value::String(self.ws_path.to_string())),
            secret_js = script_literal(&Value::String(self.secret.to_string())),
            poll_ms = POLL_INTERVAL_SECS * 1000,
        )
    }

    pub fn document(&self) -> String {
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
            escape_html(&chart_id(self.names)),
            self.body()
        )
    }
}

/// JSON literal that cannot close the surrounding `<script>` element
fn script_literal(value: &Value) -> String {
    value.to_string().replace("</", "<\\/")
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
