use co2_emissions_utils::{regex, selector};
use indexmap::{map::Entry, IndexMap};
use itertools::Itertools;
use log::{debug, info, trace, warn};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use typed_builder::TypedBuilder;

use crate::schema::{CountryName, Percentage, Record};

/// Where the emissions table lives in the page and which cells to read.
///
/// The defaults describe the Wikipedia "List of countries by carbon dioxide
/// emissions" page: the first `table.wikitable`, five leading rows that are
/// headers or world/aggregate totals, and 8-cell data rows with the country
/// in cell 0 and the 2017 share of world emissions in cell 4.
#[derive(Clone, Debug, PartialEq, Eq, TypedBuilder, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableLayout {
    #[builder(default = "table.wikitable".to_owned(), setter(into))]
    pub table_selector: String,
    #[builder(default = 5)]
    pub skip_rows: usize,
    #[builder(default = 8)]
    pub cell_count: usize,
    #[builder(default = 0)]
    pub country_column: usize,
    #[builder(default = 4)]
    pub value_column: usize,
}
impl Default for TableLayout {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// What to do when a country name shows up in more than one row.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug, clap::ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupPolicy {
    /// The earliest row wins; later ones are dropped.
    KeepFirst,
    /// The latest row's value wins, at the position of the earliest row.
    #[default]
    KeepLast,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Invalid table selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },
    #[error("No table matching {0:?} was found")]
    TableNotFound(String),
    #[error("Column {column} is out of range for rows of {cell_count} cells")]
    ColumnOutOfRange { column: usize, cell_count: usize },
}

impl TableLayout {
    fn table_selector(&self) -> Result<Selector, ExtractError> {
        Selector::parse(&self.table_selector).map_err(|e| ExtractError::InvalidSelector {
            selector: self.table_selector.clone(),
            message: format!("{e:?}"),
        })
    }

    fn validate(&self) -> Result<(), ExtractError> {
        for column in [self.country_column, self.value_column] {
            if column >= self.cell_count {
                return Err(ExtractError::ColumnOutOfRange {
                    column,
                    cell_count: self.cell_count,
                });
            }
        }
        Ok(())
    }
}

/// Reads the emissions table out of `html`.
///
/// Rows whose cell count differs from the layout, or whose value cell is not
/// a number, are skipped. The result keeps the order in which countries
/// first appear.
pub fn parse(
    html: &Html,
    layout: &TableLayout,
    dedup: DedupPolicy,
) -> Result<Vec<Record>, ExtractError> {
    layout.validate()?;
    let table = html
        .select(&layout.table_selector()?)
        .next()
        .ok_or_else(|| ExtractError::TableNotFound(layout.table_selector.clone()))?;

    let mut records = IndexMap::new();
    for (i, row) in table
        .select(selector!("tr"))
        .enumerate()
        .skip(layout.skip_rows)
    {
        let cells = row.select(selector!("td")).collect_vec();
        if cells.len() != layout.cell_count {
            trace!(
                "Row {i} has {} cells instead of {}, skipping",
                cells.len(),
                layout.cell_count
            );
            continue;
        }
        let country = cell_text(cells[layout.country_column]);
        let percentage = match cell_text(cells[layout.value_column]).parse::<Percentage>() {
            Ok(percentage) => percentage,
            Err(e) => {
                warn!("Row {i} ({country}) has an unusable value, skipping: {e}");
                continue;
            }
        };
        insert(&mut records, CountryName::from(country), percentage, dedup);
    }

    info!("Extracted {} record(s)", records.len());
    Ok(records
        .into_iter()
        .map(|(country, percentage)| Record::new(country, percentage))
        .collect())
}

fn insert(
    records: &mut IndexMap<CountryName, Percentage>,
    country: CountryName,
    percentage: Percentage,
    dedup: DedupPolicy,
) {
    match records.entry(country) {
        Entry::Vacant(entry) => {
            entry.insert(percentage);
        }
        Entry::Occupied(mut entry) => match dedup {
            DedupPolicy::KeepFirst => debug!(
                "Duplicate {}: keeping {}, dropping {percentage}",
                entry.key(),
                entry.get()
            ),
            DedupPolicy::KeepLast => {
                let old = entry.insert(percentage);
                debug!(
                    "Duplicate {}: replacing {old} with {percentage}",
                    entry.key()
                );
            }
        },
    }
}

/// Whitespace-trimmed text of a cell with footnote markers like `[a]` or `[n 1]` removed.
fn cell_text(cell: ElementRef) -> String {
    let text = cell.text().collect::<String>();
    regex!(r"\[[^\]]*\]")
        .replace_all(&text, "")
        .trim()
        .to_owned()
}

#[cfg(test)]
pub(crate) mod tests {
    use itertools::Itertools;
    use scraper::Html;

    use super::{parse, DedupPolicy, ExtractError, TableLayout};
    use crate::schema::Record;

    pub(crate) const SAMPLE_PAGE: &str = r#"<!DOCTYPE html>
<html><body>
<table class="infobox"><tr><td>Not the emissions table</td></tr></table>
<table class="wikitable sortable">
<tr><th>Country</th><th colspan="3">Fossil CO2 emissions (kt)</th><th>Share</th><th>Change</th><th colspan="2">Per</th></tr>
<tr><th>1990</th><th>2005</th><th>2017</th><th>2017 (% of world)</th><th>2017 vs 1990</th><th>land area</th><th>capita</th></tr>
<tr><td>World</td><td>22,674,116</td><td>30,049,809</td><td>37,077,404</td><td>100.00%</td><td>63.5%</td><td>73</td><td>4.9</td></tr>
<tr><td>International Aviation</td><td>258,941</td><td>422,228</td><td>543,381</td><td>1.47%</td><td>109.8%</td><td>-</td><td>-</td></tr>
<tr><td>International Shipping</td><td>371,804</td><td>563,174</td><td>677,776</td><td>1.83%</td><td>82.3%</td><td>-</td><td>-</td></tr>
<tr><td>China</td><td>2,397,048</td><td>5,876,555</td><td>10,877,218</td><td>29.34%</td><td>353.8%</td><td>1,133</td><td>7.7</td></tr>
<tr><td>United States<sup>[a]</sup></td><td>5,085,897</td><td>5,971,571</td><td>5,107,393</td><td>13.77%</td><td>0.4%</td><td>520</td><td>15.7</td></tr>
<tr><td>Footnote</td><td colspan="7">Figures exclude overseas territories</td></tr>
<tr><td> India </td><td>605,974</td><td>1,210,754</td><td>2,454,774</td><td>6.62 %</td><td>305.1%</td><td>747</td><td>1.8</td></tr>
<tr><td>Russia</td><td>2,378,921</td><td>1,733,951</td><td>1,764,866</td><td>4.76%</td><td>-25.8%</td><td>103</td><td>12.3</td><td>extra</td></tr>
<tr><td>Japan</td><td>1,149,399</td><td>1,285,440</td><td>1,320,776</td><td>3.56%</td><td>14.9%</td><td>3,495</td><td>10.4</td></tr>
</table>
<table class="wikitable">
<tr><td>Germany</td><td>1</td><td>2</td><td>3</td><td>2.15%</td><td>4</td><td>5</td><td>6</td></tr>
</table>
</body></html>"#;

    /// A page with the five leading rows followed by one 8-cell row per `(country, value)`.
    pub(crate) fn page_with_rows(rows: &[(&str, &str)]) -> String {
        let header = "<tr><th>h</th></tr>".repeat(5);
        let body = rows
            .iter()
            .map(|(country, value)| {
                format!(
                    "<tr><td>{country}</td><td>0</td><td>0</td><td>0</td><td>{value}%</td><td>0</td><td>0</td><td>0</td></tr>"
                )
            })
            .join("\n");
        format!(r#"<html><body><table class="wikitable">{header}{body}</table></body></html>"#)
    }

    fn pairs(records: &[Record]) -> Vec<(String, String)> {
        records
            .iter()
            .map(|r| (r.country().to_string(), r.percentage().to_string()))
            .collect()
    }

    fn owned(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(c, p)| (c.to_string(), p.to_string()))
            .collect()
    }

    #[test]
    fn extracts_sample_table() {
        let html = Html::parse_document(SAMPLE_PAGE);
        let records = parse(&html, &TableLayout::default(), DedupPolicy::default()).unwrap();
        assert_eq!(
            pairs(&records),
            owned(&[
                ("China", "29.34"),
                ("United States", "13.77"),
                ("India", "6.62"),
                ("Japan", "3.56"),
            ])
        );
    }

    #[test]
    fn rows_with_wrong_cell_count_are_excluded() {
        let html = Html::parse_document(SAMPLE_PAGE);
        let records = parse(&html, &TableLayout::default(), DedupPolicy::default()).unwrap();
        let countries = records.iter().map(|r| r.country().as_str()).collect_vec();
        assert!(!countries.contains(&"Russia"), "9-cell row");
        assert!(!countries.contains(&"Footnote"), "2-cell row");
        // Leading aggregate rows are skipped even though they have 8 cells
        assert!(!countries.contains(&"World"));
        // Only the first matching table is read
        assert!(!countries.contains(&"Germany"));
    }

    #[test]
    fn keep_last_overwrites_in_place() {
        let html = Html::parse_document(&page_with_rows(&[
            ("A", "10"),
            ("B", "20"),
            ("A", "30"),
            ("C", "5"),
        ]));
        let records = parse(&html, &TableLayout::default(), DedupPolicy::KeepLast).unwrap();
        assert_eq!(
            pairs(&records),
            owned(&[("A", "30"), ("B", "20"), ("C", "5")])
        );
    }

    #[test]
    fn keep_first_ignores_later_duplicates() {
        let html = Html::parse_document(&page_with_rows(&[
            ("A", "10"),
            ("B", "20"),
            ("A", "30"),
        ]));
        let records = parse(&html, &TableLayout::default(), DedupPolicy::KeepFirst).unwrap();
        assert_eq!(pairs(&records), owned(&[("A", "10"), ("B", "20")]));
    }

    #[test]
    fn unparsable_values_are_skipped() {
        let html = Html::parse_document(&page_with_rows(&[("A", "n/a"), ("B", "1.5"), ("C", "")]));
        let records = parse(&html, &TableLayout::default(), DedupPolicy::default()).unwrap();
        assert_eq!(pairs(&records), owned(&[("B", "1.5")]));
    }

    #[test]
    fn empty_country_cell_is_kept() {
        let html = Html::parse_document(&page_with_rows(&[("", "3"), ("B", "1.5")]));
        let records = parse(&html, &TableLayout::default(), DedupPolicy::default()).unwrap();
        assert_eq!(pairs(&records), owned(&[("", "3"), ("B", "1.5")]));
    }

    #[test]
    fn custom_layout() {
        let html = Html::parse_document(&page_with_rows(&[("A", "10"), ("B", "20")]));
        let layout = TableLayout::builder().skip_rows(6).build();
        let records = parse(&html, &layout, DedupPolicy::default()).unwrap();
        assert_eq!(pairs(&records), owned(&[("B", "20")]));
    }

    #[test]
    fn layout_errors() {
        let html = Html::parse_document(SAMPLE_PAGE);

        let layout = TableLayout::builder().table_selector("table.missing").build();
        assert!(matches!(
            parse(&html, &layout, DedupPolicy::default()),
            Err(ExtractError::TableNotFound(s)) if s == "table.missing"
        ));

        let layout = TableLayout::builder().table_selector("table[").build();
        assert!(matches!(
            parse(&html, &layout, DedupPolicy::default()),
            Err(ExtractError::InvalidSelector { .. })
        ));

        let layout = TableLayout::builder().value_column(8).build();
        assert!(matches!(
            parse(&html, &layout, DedupPolicy::default()),
            Err(ExtractError::ColumnOutOfRange {
                column: 8,
                cell_count: 8
            })
        ));
    }
}
