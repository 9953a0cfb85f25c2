use docqa::document_processor::ALLOWED_EXTENSIONS;

const TEMPLATE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Document question answering with Gemini</title>
<style>
  body { font-family: system-ui, sans-serif; max-width: 46rem; margin: 2rem auto; padding: 0 1rem; line-height: 1.5; }
  label { display: block; font-weight: 600; margin-top: 1.25rem; }
  input[type=password], textarea { width: 100%; box-sizing: border-box; padding: .5rem; font: inherit; }
  textarea { min-height: 5rem; }
  button { margin-top: 1rem; padding: .5rem 1.25rem; font: inherit; }
  .notice { padding: .75rem 1rem; border-radius: .4rem; margin-top: 1rem; }
  .info { background: #e8f0fe; }
  .error { background: #fde8e8; color: #8a1c1c; }
  #answer { white-space: pre-wrap; margin-top: 1.5rem; }
  [hidden] { display: none; }
</style>
</head>
<body>
<h1>📄 Document question answering with Gemini</h1>
<p>Upload a document below and ask a question about it – Gemini will answer!
To use this app, you need to provide a Google Gemini API key, which you can get
<a href="https://aistudio.google.com/app/apikey">here</a>.</p>

<form id="ask">
  <label for="api_key">Google Gemini API Key</label>
  <input id="api_key" name="api_key" type="password" autocomplete="off" placeholder="__KEY_PLACEHOLDER__">
  <div id="key-info" class="notice info" __KEY_INFO_HIDDEN__>🗝️ Please add your Google Gemini API key to continue.</div>

  <label for="document">Upload a document (__EXTENSION_LIST__)</label>
  <input id="document" name="document" type="file" accept="__ACCEPT__">

  <label for="question">Now ask a question about the document!</label>
  <textarea id="question" name="question" placeholder="Can you give me a short summary?" disabled></textarea>

  <button id="submit" type="submit" disabled>Ask</button>
</form>

<div id="info" class="notice info" hidden></div>
<div id="error" class="notice error" hidden></div>
<div id="answer"></div>

<script>
const form = document.getElementById("ask");
const keyInput = document.getElementById("api_key");
const keyInfo = document.getElementById("key-info");
const fileInput = document.getElementById("document");
const question = document.getElementById("question");
const submit = document.getElementById("submit");
const info = document.getElementById("info");
const error = document.getElementById("error");
const answer = document.getElementById("answer");
const serverHasKey = __SERVER_HAS_KEY__;

function refresh() {
  const hasKey = serverHasKey || keyInput.value.trim() !== "";
  keyInfo.hidden = hasKey;
  question.disabled = fileInput.files.length === 0;
  submit.disabled = !hasKey || question.disabled || question.value.trim() === "";
}

function show(box, message) {
  box.textContent = message;
  box.hidden = !message;
}

function handle(event) {
  switch (event.type) {
    case "token": answer.textContent += event.content; break;
    case "info": show(info, event.message); break;
    case "error": show(error, event.message); break;
  }
}

keyInput.addEventListener("input", refresh);
fileInput.addEventListener("change", refresh);
question.addEventListener("input", refresh);

form.addEventListener("submit", async (e) => {
  e.preventDefault();
  show(info, "");
  show(error, "");
  answer.textContent = "";
  submit.disabled = true;

  try {
    const response = await fetch("/api/ask", { method: "POST", body: new FormData(form) });
    if (!response.ok) {
      const body = await response.json().catch(() => ({ error: response.statusText }));
      show(error, body.error);
      return;
    }

    const reader = response.body.getReader();
    const decoder = new TextDecoder();
    let buffer = "";
    for (;;) {
      const { value, done } = await reader.read();
      if (done) break;
      buffer += decoder.decode(value, { stream: true });
      let end;
      while ((end = buffer.indexOf("\n\n")) !== -1) {
        const block = buffer.slice(0, end);
        buffer = buffer.slice(end + 2);
        const data = block.split("\n")
          .filter((line) => line.startsWith("data:"))
          .map((line) => line.slice(5).replace(/^ /, ""))
          .join("\n");
        if (data) handle(JSON.parse(data));
      }
    }
  } catch (err) {
    show(error, String(err));
  } finally {
    refresh();
  }
});

refresh();
</script>
</body>
</html>
"#;

/// Renders the single page. `server_has_key` hides the key notice when a
/// fallback key is configured on the server.
pub fn render(server_has_key: bool) -> String {
    let accept: Vec<String> = ALLOWED_EXTENSIONS.iter().map(|ext| format!(".{ext}")).collect();

    TEMPLATE
        .replace("__ACCEPT__", &accept.join(","))
        .replace("__EXTENSION_LIST__", &accept.join(" or "))
        .replace(
            "__KEY_PLACEHOLDER__",
            if server_has_key { "Using the server's key" } else { "" },
        )
        .replace("__KEY_INFO_HIDDEN__", if server_has_key { "hidden" } else { "" })
        .replace("__SERVER_HAS_KEY__", if server_has_key { "true" } else { "false" })
}
