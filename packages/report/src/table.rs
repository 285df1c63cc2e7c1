//! Sortable richness table.
//!
//! Rows are emitted in the summary's order (richness descending). Header
//! cells carry a `data-sort` type that the page script uses to re-sort the
//! table client-side.

use richness_map_models::RichnessRecord;

use crate::html::escape;

/// Renders the table of area name, richness, and occurrence count.
#[must_use]
pub fn richness_table(records: &[RichnessRecord]) -> String {
    let mut html = String::from(
        "<table id=\"richness-table\" class=\"sortable\">\
         <thead><tr>\
         <th data-sort=\"text\">Conservation area</th>\
         <th data-sort=\"number\" aria-sort=\"descending\">Species richness</th>\
         <th data-sort=\"number\">Occurrences</th>\
         </tr></thead><tbody>",
    );

    for record in records {
        html.push_str(&format!(
            "<tr><td>{}</td><td class=\"num\">{}</td><td class=\"num\">{}</td></tr>",
            escape(&record.area_name),
            record.richness,
            record.occurrence_count,
        ));
    }

    html.push_str("</tbody></table>");
    html
}
