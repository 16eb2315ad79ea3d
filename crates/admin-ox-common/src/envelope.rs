use serde::{Deserialize, Serialize};

use crate::error::CommonRequestError;

/// Code the backend uses for a successful call
pub const SUCCESS_CODE: i64 = 0;

/// Response envelope wrapped around every JSON payload of the admin backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommonResult<T> {
    pub code: i64,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub msg: String,
}

impl<T> CommonResult<T> {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }

    /// Unwrap the payload, turning a non-zero code into [`CommonRequestError::Api`].
    pub fn into_data(self) -> Result<T, CommonRequestError> {
        self.check()?;
        self.data.ok_or_else(|| {
            CommonRequestError::UnexpectedResponse("envelope has no data field".to_string())
        })
    }

    /// Check the code only, for calls whose payload carries no information.
    pub fn into_unit(self) -> Result<(), CommonRequestError> {
        self.check()
    }

    fn check(&self) -> Result<(), CommonRequestError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(CommonRequestError::Api {
                code: self.code,
                msg: self.msg.clone(),
            })
        }
    }
}

/// Paging parameters understood by list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParam {
    pub page_no: u32,
    pub page_size: u32,
}

impl Default for PageParam {
    fn default() -> Self {
        Self {
            page_no: 1,
            page_size: 10,
        }
    }
}

impl PageParam {
    #[must_use]
    pub fn new(page_no: u32, page_size: u32) -> Self {
        Self { page_no, page_size }
    }

    /// Render as `pageNo`/`pageSize` query parameters
    #[must_use]
    pub fn to_query_params(&self) -> Vec<(String, String)> {
        vec![
            ("pageNo".to_string(), self.page_no.to_string()),
            ("pageSize".to_string(), self.page_size.to_string()),
        ]
    }
}

/// One page of a paged listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult<T> {
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
    #[serde(default)]
    pub total: u64,
}

impl<T> PageResult<T> {
    /// Wrap an unpaged listing, using its length as the total.
    #[must_use]
    pub fn from_list(list: Vec<T>) -> Self {
        let total = list.len() as u64;
        Self { list, total }
    }
}

impl<T> Default for PageResult<T> {
    fn default() -> Self {
        Self {
            list: Vec::new(),
            total: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope_yields_data() {
        let result: CommonResult<Vec<u32>> =
            serde_json::from_value(json!({"code": 0, "data": [1, 2], "msg": ""})).unwrap();
        assert_eq!(result.into_data().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_error_code_becomes_api_error() {
        let result: CommonResult<String> =
            serde_json::from_value(json!({"code": 1_002_001, "msg": "not found"})).unwrap();
        match result.into_data() {
            Err(CommonRequestError::Api { code, msg }) => {
                assert_eq!(code, 1_002_001);
                assert_eq!(msg, "not found");
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_data_is_unexpected() {
        let result: CommonResult<String> = serde_json::from_value(json!({"code": 0})).unwrap();
        assert!(matches!(
            result.into_data(),
            Err(CommonRequestError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_unit_ignores_missing_data() {
        let result: CommonResult<serde_json::Value> =
            serde_json::from_value(json!({"code": 0, "msg": ""})).unwrap();
        assert!(result.into_unit().is_ok());
    }

    #[test]
    fn test_page_result_from_list() {
        let page = PageResult::from_list(vec!["a", "b", "c"]);
        assert_eq!(page.total, 3);
        assert_eq!(page.list.len(), 3);
    }
}
