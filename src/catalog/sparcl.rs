//! Blocking HTTP client for the NOIRLab SPARCL service.

use std::time::Duration;

use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};

use super::{CatalogClient, CatalogError, Constraints};
use crate::data::model::SpectrumRecord;

/// Public SPARCL API root.
pub const DEFAULT_URL: &str = "https://astrosparcl.datalab.noirlab.edu/sparc";

/// SPARCL client over `reqwest`'s blocking API.
#[derive(Debug, Clone)]
pub struct SparclClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl SparclClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CatalogError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("desi-spec/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| CatalogError::Http {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        body: &Value,
    ) -> Result<Value, CatalogError> {
        let url = format!("{}/{endpoint}/", self.base_url);
        log::debug!("POST {url} {query:?}");

        let http_err = |source| CatalogError::Http {
            url: url.clone(),
            source,
        };
        let resp = self
            .http
            .post(&url)
            .query(query)
            .json(body)
            .send()
            .map_err(http_err)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(CatalogError::Status {
                url: url.clone(),
                status: status.as_u16(),
                body,
            });
        }
        resp.json::<Value>().map_err(http_err)
    }
}

impl CatalogClient for SparclClient {
    fn find(
        &self,
        outfields: &[&str],
        constraints: &Constraints,
        limit: Option<usize>,
    ) -> Result<Vec<String>, CatalogError> {
        let mut query = Vec::new();
        if let Some(n) = limit {
            query.push(("limit", n.to_string()));
        }
        let body = find_request_body(outfields, constraints);
        let resp = self.post("find", &query, &body)?;
        parse_find_response(&format!("{}/find/", self.base_url), resp)
    }

    fn retrieve(
        &self,
        ids: &[String],
        include: &[&str],
        dataset_list: &[String],
        limit: Option<usize>,
    ) -> Result<Vec<SpectrumRecord>, CatalogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut query = vec![
            ("include", include.join(",")),
            ("dataset_list", dataset_list.join(",")),
            ("format", "json".to_string()),
        ];
        if let Some(n) = limit {
            query.push(("limit", n.to_string()));
        }
        let resp = self.post("spectras", &query, &json!(ids))?;
        parse_retrieve_response(&format!("{}/spectras/", self.base_url), resp)
    }
}

// ---------------------------------------------------------------------------
// Request / response encoding
// ---------------------------------------------------------------------------

/// JSON body of a `find` request.
pub fn find_request_body(outfields: &[&str], constraints: &Constraints) -> Value {
    json!({
        "outfields": outfields,
        "search": constraints.search_terms(),
    })
}

/// Split a SPARCL response into its records, surfacing a failed status header.
///
/// Responses are JSON arrays; the first element is a status header and the
/// remaining ones are records.
fn response_records(url: &str, resp: Value) -> Result<Vec<Value>, CatalogError> {
    let Value::Array(items) = resp else {
        return Err(CatalogError::Decode {
            url: url.to_string(),
            reason: "expected a JSON array".to_string(),
        });
    };

    let mut items = items.into_iter().peekable();
    if let Some(status) = items.peek().and_then(|head| head.get("status")) {
        if status.get("success").and_then(Value::as_bool) == Some(false) {
            let message = status
                .get("errors")
                .map(|e| e.to_string())
                .unwrap_or_else(|| status.to_string());
            return Err(CatalogError::Service {
                url: url.to_string(),
                message,
            });
        }
    }

    Ok(items.filter(|item| item.get("sparcl_id").is_some()).collect())
}

/// Identifiers from a `find` response.
pub fn parse_find_response(url: &str, resp: Value) -> Result<Vec<String>, CatalogError> {
    response_records(url, resp)?
        .into_iter()
        .enumerate()
        .map(|(index, rec)| {
            rec.get("sparcl_id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| CatalogError::InvalidRecord {
                    index,
                    reason: "sparcl_id is not a string".to_string(),
                })
        })
        .collect()
}

/// Validated records from a `retrieve` response.
pub fn parse_retrieve_response(
    url: &str,
    resp: Value,
) -> Result<Vec<SpectrumRecord>, CatalogError> {
    response_records(url, resp)?
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let raw: SparclRecord = serde_json::from_value(value).map_err(|e| {
                CatalogError::InvalidRecord {
                    index,
                    reason: e.to_string(),
                }
            })?;
            let rec = raw.into_record();
            rec.validate().map_err(|e| CatalogError::InvalidRecord {
                index,
                reason: e.to_string(),
            })?;
            Ok(rec)
        })
        .collect()
}

/// Record as SPARCL serialises it; masked floats may arrive as `null`.
#[derive(Debug, Deserialize)]
struct SparclRecord {
    sparcl_id: String,
    #[serde(default)]
    specid: Option<i64>,
    #[serde(default)]
    targetid: Option<i64>,
    data_release: String,
    ra: f64,
    dec: f64,
    spectype: String,
    redshift: f64,
    #[serde(deserialize_with = "nullable_floats")]
    wavelength: Vec<f64>,
    #[serde(deserialize_with = "nullable_floats")]
    flux: Vec<f64>,
    #[serde(deserialize_with = "nullable_floats")]
    ivar: Vec<f64>,
    #[serde(default, deserialize_with = "optional_nullable_floats")]
    model: Option<Vec<f64>>,
    #[serde(default)]
    mask: Option<Vec<i32>>,
}

fn nullable_floats<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
    let values: Vec<Option<f64>> = Vec::deserialize(d)?;
    Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

fn optional_nullable_floats<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<f64>>, D::Error> {
    let values: Option<Vec<Option<f64>>> = Option::deserialize(d)?;
    Ok(values.map(|v| v.into_iter().map(|x| x.unwrap_or(f64::NAN)).collect()))
}

impl SparclRecord {
    fn into_record(self) -> SpectrumRecord {
        SpectrumRecord {
            sparcl_id: self.sparcl_id,
            specid: self.specid,
            targetid: self.targetid,
            data_release: self.data_release,
            ra: self.ra,
            dec: self.dec,
            spectype: self.spectype,
            redshift: self.redshift,
            wavelength: self.wavelength,
            flux: self.flux,
            ivar: self.ivar,
            model: self.model,
            mask: self.mask,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::parse_range;

    const URL: &str = "https://example.invalid/sparc/spectras/";

    fn header() -> Value {
        json!({"status": {"success": true, "info": [], "warnings": []}})
    }

    #[test]
    fn find_body_carries_outfields_and_search() {
        let cons = Constraints::new(parse_range("0,10").unwrap(), parse_range("-10,10").unwrap());
        let body = find_request_body(&["sparcl_id", "ra"], &cons);
        assert_eq!(body["outfields"], json!(["sparcl_id", "ra"]));
        assert_eq!(body["search"][0], json!(["spectype", "GALAXY"]));
        assert_eq!(body["search"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn find_response_skips_header() {
        let resp = json!([
            header(),
            {"sparcl_id": "00001ebf-1e28-11ef-9d91-525400ad1336", "ra": 1.0, "_dr": "DESI-DR1"},
            {"sparcl_id": "0001d5b1-1e29-11ef-9d91-525400ad1336", "ra": 2.0, "_dr": "DESI-DR1"},
        ]);
        let ids = parse_find_response(URL, resp).unwrap();
        assert_eq!(
            ids,
            vec![
                "00001ebf-1e28-11ef-9d91-525400ad1336",
                "0001d5b1-1e29-11ef-9d91-525400ad1336"
            ]
        );
        assert!(parse_find_response(URL, json!([header()])).unwrap().is_empty());
    }

    #[test]
    fn failed_status_header_is_a_service_error() {
        let resp = json!([{"status": {"success": false, "errors": ["bad constraint"]}}]);
        let err = parse_find_response(URL, resp).unwrap_err();
        assert!(matches!(err, CatalogError::Service { .. }));
        assert!(err.to_string().contains("bad constraint"));
    }

    #[test]
    fn non_array_response_is_rejected() {
        let err = parse_retrieve_response(URL, json!({"detail": "nope"})).unwrap_err();
        assert!(matches!(err, CatalogError::Decode { .. }));
    }

    #[test]
    fn retrieve_response_becomes_validated_records() {
        let resp = json!([
            header(),
            {
                "sparcl_id": "abc",
                "specid": 12,
                "targetid": 39627835576420141_i64,
                "data_release": "DESI-DR1",
                "ra": 3.5,
                "dec": -1.25,
                "spectype": "GALAXY",
                "redshift": 0.07,
                "wavelength": [3600.0, 3600.8, 3601.6],
                "flux": [1.0, null, 2.0],
                "ivar": [4.0, 0.0, 1.0],
                "model": [1.1, 1.2, 1.9],
                "mask": [0, 1, 0],
                "_dr": "DESI-DR1"
            }
        ]);
        let recs = parse_retrieve_response(URL, resp).unwrap();
        assert_eq!(recs.len(), 1);
        let rec = &recs[0];
        assert_eq!(rec.sparcl_id, "abc");
        assert_eq!(rec.targetid, Some(39627835576420141));
        assert!(rec.flux[1].is_nan());
        assert_eq!(rec.mask, Some(vec![0, 1, 0]));
        assert_eq!(rec.model.as_ref().map(Vec::len), Some(3));
    }

    #[test]
    fn ragged_record_is_rejected_at_the_boundary() {
        let resp = json!([
            header(),
            {
                "sparcl_id": "abc",
                "data_release": "DESI-DR1",
                "ra": 3.5, "dec": -1.25,
                "spectype": "GALAXY", "redshift": 0.07,
                "wavelength": [3600.0, 3600.8],
                "flux": [1.0],
                "ivar": [4.0, 1.0]
            }
        ]);
        let err = parse_retrieve_response(URL, resp).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidRecord { index: 0, .. }));
    }

    #[test]
    fn record_missing_fields_is_rejected() {
        let resp = json!([header(), {"sparcl_id": "abc"}]);
        let err = parse_retrieve_response(URL, resp).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidRecord { index: 0, .. }));
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client =
            SparclClient::new("https://example.invalid/sparc/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "https://example.invalid/sparc");
    }
}
