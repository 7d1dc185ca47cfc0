//! Form state and HTML rendering.

use estudo_core::{LoadError, LookupTable, Selection};
use quick_xml::escape::escape;

const TITLE: &str = "Geração de estudo de viabilidade para implementação de Baterias";

/// Where the user is in the select → generate flow.
///
/// `Generating` and `Ready` have no page of their own: generation happens
/// inside the `POST /generate` request and a ready study is sent back as the
/// download itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormState {
    /// Nothing selected.
    Idle,
    /// A client is selected, the cargo is not.
    EntitySelected { entity: String },
    /// Both selected; generation may be triggered.
    Complete(Selection),
    /// The last generation failed; selections are kept for a retry.
    Failed { selection: Selection, message: String },
}

impl FormState {
    /// Derive the state from the submitted form values.
    ///
    /// The cargo is dropped when the client changed since the previous
    /// submission (`prev_entity`) or when it is not a cargo of the client.
    /// Unknown clients fall back to `Idle`.
    pub fn from_query(
        table: &LookupTable,
        entity: &str,
        cargo: &str,
        prev_entity: Option<&str>,
    ) -> Self {
        if entity.is_empty() || table.cargos_for(entity).is_empty() {
            return FormState::Idle;
        }

        let entity_changed = prev_entity.is_some_and(|prev| prev != entity);
        if entity_changed || cargo.is_empty() || table.find(entity, cargo).is_none() {
            return FormState::EntitySelected {
                entity: entity.to_string(),
            };
        }

        FormState::Complete(Selection::new(entity, cargo))
    }

    pub fn entity(&self) -> &str {
        match self {
            FormState::Idle => "",
            FormState::EntitySelected { entity } => entity,
            FormState::Complete(selection) | FormState::Failed { selection, .. } => {
                &selection.entity_name
            }
        }
    }

    pub fn cargo(&self) -> &str {
        match self {
            FormState::Idle | FormState::EntitySelected { .. } => "",
            FormState::Complete(selection) | FormState::Failed { selection, .. } => {
                &selection.cargo_name
            }
        }
    }

    /// Whether the generate button is enabled.
    pub fn can_generate(&self) -> bool {
        match self {
            FormState::Complete(selection) | FormState::Failed { selection, .. } => {
                selection.is_complete()
            }
            _ => false,
        }
    }
}

/// Render the selection form.
pub fn render_form(table: &LookupTable, state: &FormState) -> String {
    let entity = state.entity();
    let cargo = state.cargo();

    let mut body = String::new();

    if let FormState::Failed { message, .. } = state {
        body.push_str(&format!(
            "<div class=\"error\"><p>Erro ao gerar o estudo. Por favor, tente novamente.</p><pre>{}</pre></div>\n",
            escape(message.as_str())
        ));
    }

    body.push_str("<form method=\"get\" action=\"/\" class=\"columns\">\n");
    body.push_str(&format!(
        "<input type=\"hidden\" name=\"prev_entity\" value=\"{}\">\n",
        escape(entity)
    ));
    body.push_str("<label>Selecione o Cliente\n");
    body.push_str(&select("entity", &table.distinct_entities(), entity));
    body.push_str("</label>\n<label>Selecione a Carga\n");
    body.push_str(&select("cargo", &table.cargos_for(entity), cargo));
    body.push_str("</label>\n<noscript><button type=\"submit\">Atualizar</button></noscript>\n</form>\n");

    body.push_str("<form method=\"post\" action=\"/generate\">\n");
    body.push_str(&format!(
        "<input type=\"hidden\" name=\"entity\" value=\"{}\">\n<input type=\"hidden\" name=\"cargo\" value=\"{}\">\n",
        escape(entity),
        escape(cargo)
    ));
    body.push_str(&format!(
        "<button type=\"submit\" class=\"primary\"{}>Gerar Estudo</button>\n</form>\n",
        if state.can_generate() { "" } else { " disabled" }
    ));

    if state.can_generate() {
        if let Some(record) = table.find(entity, cargo) {
            body.push_str(&format!(
                "<p class=\"details\">CNPJ da carga: {} &middot; Código: {}</p>\n",
                escape(record.cargo_tax_id.as_str()),
                escape(record.cargo_code.as_str())
            ));
        }
    } else {
        body.push_str("<p class=\"info\">Selecione um cliente e uma carga para gerar o estudo.</p>\n");
    }

    layout(&body)
}

/// Page shown when the lookup table cannot be loaded. No controls are rendered.
pub fn render_load_error(error: &LoadError) -> String {
    layout(&format!(
        "<div class=\"error\"><p>Não foi possível carregar os dados. Verifique se o arquivo CSV está presente e no formato correto.</p><pre>{}</pre></div>\n",
        escape(error.to_string().as_str())
    ))
}

/// Minimal page for unexpected failures.
pub fn render_internal_error(message: &str) -> String {
    layout(&format!(
        "<div class=\"error\"><p>Erro interno.</p><pre>{}</pre></div>\n",
        escape(message)
    ))
}

fn select(name: &str, options: &[String], selected: &str) -> String {
    let mut html = format!(
        "<select name=\"{}\" onchange=\"this.form.submit()\">\n<option value=\"\"></option>\n",
        name
    );
    for option in options {
        let escaped = escape(option.as_str());
        let marker = if option == selected { " selected" } else { "" };
        html.push_str(&format!(
            "<option value=\"{}\"{}>{}</option>\n",
            escaped, marker, escaped
        ));
    }
    html.push_str("</select>\n");
    html
}

fn layout(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
<meta charset="utf-8">
<title>Gerador de estudos de viabilidade</title>
<style>
body {{ font-family: sans-serif; margin: 2rem; }}
.columns {{ display: flex; gap: 2rem; }}
.columns label {{ flex: 1; display: flex; flex-direction: column; gap: .5rem; }}
.error {{ color: #8a1c1c; background: #fdecea; padding: .5rem 1rem; }}
.info {{ color: #1c4f8a; }}
button.primary {{ margin-top: 1rem; }}
</style>
</head>
<body>
<main>
<h1>{}</h1>
{}</main>
</body>
</html>
"#,
        TITLE, body
    )
}
