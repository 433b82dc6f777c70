//! Plain-text summary of a signal bundle for operators

use crate::audit::SignalBundle;
use std::fmt::Write;

fn yes_no(value: bool) -> &'static str {
    if value { "oui" } else { "non" }
}

fn date_or_dash(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Render a compact, line-oriented summary of one site
pub fn render_text(site: &str, bundle: &SignalBundle) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", site);

    if let Some(error) = &bundle.audit_erreur {
        let _ = writeln!(out, "  erreur            : {}", error);
        return out;
    }

    let _ = writeln!(
        out,
        "  pages             : {} (profondeur {}, {} en erreur)",
        bundle.nb_pages, bundle.profondeur_max, bundle.pages_en_erreur
    );
    let _ = writeln!(out, "  cms               : {}", bundle.cms_detecte);
    let _ = writeln!(
        out,
        "  blog              : {} {}",
        bundle.blog_status,
        bundle.blog_url.as_deref().unwrap_or("")
    );
    let _ = writeln!(
        out,
        "  activité          : {} (dernière date {}, fréquence {})",
        bundle.activite_status,
        date_or_dash(bundle.derniere_date),
        bundle.frequence_publication
    );
    let _ = writeln!(
        out,
        "  sitemap / robots  : {} / {}   rss : {}",
        yes_no(bundle.has_sitemap),
        yes_no(bundle.has_robots_txt),
        yes_no(bundle.has_rss)
    );
    let _ = writeln!(
        out,
        "  title             : {} manquants, {} courts, {:.0}% dupliqués",
        bundle.pages_sans_title,
        bundle.pages_title_court,
        bundle.titles_dupliques * 100.0
    );
    let _ = writeln!(
        out,
        "  meta / h1         : {} sans description, {} sans h1, {} multi-h1",
        bundle.pages_sans_meta_desc, bundle.pages_sans_h1, bundle.pages_h1_multiple
    );
    let _ = writeln!(
        out,
        "  indexation        : {} sans canonical, {} noindex",
        bundle.pages_sans_canonical, bundle.pages_noindex
    );
    let _ = writeln!(
        out,
        "  contenu           : {} mots/page, {} pages vides, ratio texte/html {:.2}",
        bundle.mots_moyen_par_page, bundle.pages_vides, bundle.ratio_texte_html
    );
    out
}
