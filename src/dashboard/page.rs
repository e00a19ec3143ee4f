//! HTML rendering of a [`DashboardView`].

use std::fmt::Write;
use tracing::warn;

use crate::charts::{Chart, Rendered, render_svg};
use crate::dashboard::view::DashboardView;
use crate::pipeline::Ranking;

const STYLE: &str = "body{font-family:sans-serif;margin:2rem;color:#222}\
    .kpis{display:flex;gap:2rem}.kpi{padding:1rem;border:1px solid #ddd;border-radius:6px}\
    .kpi .value{font-size:1.8rem;font-weight:bold}\
    .grid{display:grid;grid-template-columns:1fr 1fr;gap:1.5rem}\
    .panel{border:1px solid #eee;padding:1rem;border-radius:6px;overflow:auto}\
    .warning{background:#fff4e5;border-left:4px solid #f0a020;padding:.6rem 1rem;margin:.5rem 0}\
    table{border-collapse:collapse;width:100%}td,th{border-bottom:1px solid #eee;padding:.25rem .5rem;text-align:left}\
    td.num{text-align:right}details{max-height:420px;overflow:auto}";

/// Body of one dashboard panel.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelBody {
    Svg(String),
    Table {
        key_header: String,
        value_header: String,
        /// Keys with their formatted values.
        rows: Vec<(String, String)>,
    },
    Placeholder(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: String,
    pub body: PanelBody,
}

/// The six panels shown below the summary figures, in page order.
pub fn panels(view: &DashboardView) -> Vec<Panel> {
    let top_n = view.brands.top.len();
    let mut panels = vec![
        Panel {
            title: format!("Top {top_n} Bandeiras por Nº de Postos"),
            body: chart_body(&Chart::Bar(view.brands.bar_chart(
                "Postos por Bandeira",
                "Quantidade de Postos",
                "Bandeira",
            ))),
        },
        table_panel(
            "Ver dados de Postos por Bandeira",
            "Bandeira",
            "Postos",
            Some(&view.brands),
            format_count,
        ),
    ];

    match &view.agents {
        Some(agents) => {
            panels.push(Panel {
                title: format!(
                    "Top {} Agentes por Volume de Vendas ({})",
                    agents.top.len(),
                    view.state_code
                ),
                body: chart_body(&Chart::Bar(agents.bar_chart(
                    "Volume por Agente Regulado",
                    "Volume Vendido (mil m³)",
                    "Agente Regulado",
                ))),
            });
        }
        None => panels.push(Panel {
            title: "Agentes por Volume de Vendas".to_string(),
            body: PanelBody::Placeholder(
                "Dados de vendas não disponíveis para exibir o gráfico de volume.".to_string(),
            ),
        }),
    }
    panels.push(table_panel(
        "Ver dados de Volume por Agente",
        "Agente Regulado",
        "Volume (mil m³)",
        view.agents.as_ref(),
        format_decimal,
    ));

    let share_body = match &view.share_trend {
        Some(Ok(trend)) => chart_body(&Chart::Line(trend.chart())),
        Some(Err(e)) => PanelBody::Placeholder(e.to_string()),
        None => PanelBody::Placeholder("Dados de vendas não disponíveis.".to_string()),
    };
    panels.push(Panel {
        title: "Evolução do Market Share".to_string(),
        body: share_body,
    });

    panels.push(Panel {
        title: format!("Crescimento de Postos (a partir de {})", view.min_year),
        body: chart_body(&Chart::Line(view.growth.chart(view.min_year))),
    });

    panels
}

/// Renders the complete page.
pub fn render(view: &DashboardView) -> String {
    let mut html = String::with_capacity(64 * 1024);
    let _ = write!(
        html,
        "<!DOCTYPE html><html lang=\"pt-BR\"><head><meta charset=\"utf-8\">\
         <title>Dashboard do Mercado de Combustíveis</title><style>{STYLE}</style></head><body>"
    );
    let _ = write!(
        html,
        "<h1>Dashboard do Mercado de Combustíveis - {}</h1>\
         <p>Análise da distribuição de postos por bandeira e volume de vendas por agente regulado.</p>",
        escape_html(&view.state_code)
    );

    for warning in &view.warnings {
        let _ = write!(html, "<div class=\"warning\">{}</div>", escape_html(warning));
    }

    render_filter(&mut html, view);
    render_kpis(&mut html, view);

    html.push_str("<h2>Visualizações Detalhadas</h2><div class=\"grid\">");
    for panel in panels(view) {
        render_panel(&mut html, &panel);
    }
    html.push_str("</div></body></html>");
    html
}

fn render_filter(html: &mut String, view: &DashboardView) {
    html.push_str(
        "<form method=\"get\" action=\"/\"><label for=\"municipio\">Selecione o Município: </label>\
         <select id=\"municipio\" name=\"municipio\" onchange=\"this.form.submit()\">",
    );
    let options = std::iter::once("Todos").chain(view.municipalities.iter().map(String::as_str));
    for option in options {
        let selected = if option == view.selected_label() { " selected" } else { "" };
        let escaped = escape_html(option);
        let _ = write!(html, "<option value=\"{escaped}\"{selected}>{escaped}</option>");
    }
    html.push_str("</select> <noscript><button type=\"submit\">Filtrar</button></noscript></form>");
}

fn render_kpis(html: &mut String, view: &DashboardView) {
    let _ = write!(
        html,
        "<h2>Resumo para: {}</h2><div class=\"kpis\">",
        escape_html(view.selected_label())
    );
    kpi(html, "Total de Postos", &format_count(view.total_stations as f64));
    kpi(html, "Nº de Bandeiras Diferentes", &view.distinct_brands().to_string());
    if let Some(volume) = view.total_volume() {
        kpi(
            html,
            &format!("Volume Total Vendido no {} (mil m³)", view.state_code),
            &format_decimal(volume),
        );
    }
    html.push_str("</div>");
}

fn kpi(html: &mut String, label: &str, value: &str) {
    let _ = write!(
        html,
        "<div class=\"kpi\"><div>{}</div><div class=\"value\">{}</div></div>",
        escape_html(label),
        escape_html(value)
    );
}

fn render_panel(html: &mut String, panel: &Panel) {
    let _ = write!(html, "<section class=\"panel\"><h3>{}</h3>", escape_html(&panel.title));
    match &panel.body {
        PanelBody::Svg(svg) => html.push_str(svg),
        PanelBody::Placeholder(message) => {
            let _ = write!(html, "<div class=\"warning\">{}</div>", escape_html(message));
        }
        PanelBody::Table {
            key_header,
            value_header,
            rows,
        } => {
            let _ = write!(
                html,
                "<details><summary>{} linhas</summary><table><tr><th>{}</th><th>{}</th></tr>",
                rows.len(),
                escape_html(key_header),
                escape_html(value_header)
            );
            for (key, value) in rows {
                let _ = write!(
                    html,
                    "<tr><td>{}</td><td class=\"num\">{}</td></tr>",
                    escape_html(key),
                    escape_html(value)
                );
            }
            html.push_str("</table></details>");
        }
    }
    html.push_str("</section>");
}

fn chart_body(chart: &Chart) -> PanelBody {
    match render_svg(chart) {
        Ok(Rendered::Chart(svg)) => PanelBody::Svg(svg),
        Ok(Rendered::Warning(message)) => PanelBody::Placeholder(message),
        Err(e) => {
            warn!(title = chart.title(), error = %e, "Chart rendering failed");
            PanelBody::Placeholder(format!("Não foi possível gerar o gráfico: {e}"))
        }
    }
}

fn table_panel(
    title: &str,
    key_header: &str,
    value_header: &str,
    ranking: Option<&Ranking>,
    format_value: fn(f64) -> String,
) -> Panel {
    let body = match ranking {
        Some(r) if !r.is_empty() => PanelBody::Table {
            key_header: key_header.to_string(),
            value_header: value_header.to_string(),
            rows: r
                .full
                .iter()
                .map(|(key, value)| (key.clone(), format_value(*value)))
                .collect(),
        },
        _ => PanelBody::Placeholder("Sem dados.".to_string()),
    };
    Panel {
        title: title.to_string(),
        body,
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Formats a whole number with comma thousands separators: `12,345`.
pub fn format_count(value: f64) -> String {
    group_thousands(&format!("{:.0}", value))
}

/// Formats with two decimals and comma thousands separators: `1,234.50`.
pub fn format_decimal(value: f64) -> String {
    let fixed = format!("{value:.2}");
    match fixed.split_once('.') {
        Some((int, frac)) => format!("{}.{frac}", group_thousands(int)),
        None => group_thousands(&fixed),
    }
}

fn group_thousands(digits: &str) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    format!("{sign}{out}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn empty_view(warnings: Vec<String>) -> DashboardView {
        DashboardView::build(&Config::default(), None, None, None, warnings)
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
        assert_eq!(escape_html("SÃO GONÇALO"), "SÃO GONÇALO");
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_count(0.0), "0");
        assert_eq!(format_count(999.0), "999");
        assert_eq!(format_count(1234567.0), "1,234,567");
        assert_eq!(format_decimal(1234.5), "1,234.50");
        assert_eq!(format_decimal(-98765.432), "-98,765.43");
        assert_eq!(format_decimal(0.004), "0.00");
    }

    #[test]
    fn test_empty_view_has_six_placeholder_panels() {
        let panels = panels(&empty_view(vec![]));
        assert_eq!(panels.len(), 6);
        assert!(
            panels
                .iter()
                .all(|p| matches!(p.body, PanelBody::Placeholder(_)))
        );
    }

    #[test]
    fn test_render_shows_warnings_escaped() {
        let html = render(&empty_view(vec!["falha <rede>".to_string()]));
        assert!(html.contains("falha &lt;rede&gt;"));
        assert!(html.contains("Dados de vendas não disponíveis"));
        assert!(!html.contains("Volume Total Vendido"));
    }

    #[test]
    fn test_render_filter_marks_selection() {
        let mut view = empty_view(vec![]);
        view.municipalities = vec!["MARICA".to_string(), "NITEROI".to_string()];
        view.selected = Some("NITEROI".to_string());

        let html = render(&view);
        assert!(html.contains("<option value=\"NITEROI\" selected>NITEROI</option>"));
        assert!(html.contains("<option value=\"Todos\">Todos</option>"));
        assert!(html.contains("Resumo para: NITEROI"));
    }
}
