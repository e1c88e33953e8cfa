#[cfg(test)]
mod tests {
    use crate::pagination::{normalize, paginate, PaginationOptions, PaginationQuery};
    use crate::tests::{body_json, get};
    use axum::{routing, Json, Router};

    async fn extract(uri: &str) -> PaginationQuery {
        async fn echo(q: PaginationQuery) -> Json<serde_json::Value> {
            Json(serde_json::json!({
                "page": q.page,
                "limit": q.limit,
                "search": q.search,
                "sortBy": q.sort_by,
                "sortOrder": q.sort_order,
            }))
        }
        let app = Router::new().route("/items", routing::get(echo));
        let json = body_json(get(app, uri).await).await;
        PaginationQuery {
            page: json["page"].as_i64(),
            limit: json["limit"].as_i64(),
            search: json["search"].as_str().map(str::to_string),
            sort_by: json["sortBy"].as_str().map(str::to_string),
            sort_order: json["sortOrder"].as_str().map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_reads_all_parameters() {
        let q = extract("/items?page=2&limit=25&search=jo%20hn&sortBy=name&sortOrder=asc").await;
        assert_eq!(q.page, Some(2));
        assert_eq!(q.limit, Some(25));
        assert_eq!(q.search(), Some("jo hn"));
        assert_eq!(q.sort_by.as_deref(), Some("name"));
        assert_eq!(q.sort_order.as_deref(), Some("asc"));
    }

    #[tokio::test]
    async fn test_accepts_snake_case_sort_keys() {
        let q = extract("/items?sort_by=created_at&sort_order=desc").await;
        assert_eq!(q.sort_by.as_deref(), Some("created_at"));
        assert_eq!(q.sort_order.as_deref(), Some("desc"));
    }

    #[tokio::test]
    async fn test_malformed_numbers_become_none() {
        let q = extract("/items?page=abc&limit=1.5").await;
        assert_eq!(q.page, None);
        assert_eq!(q.limit, None);
        let req = normalize(&q.options());
        assert_eq!((req.page, req.limit), (1, 10));
    }

    #[tokio::test]
    async fn test_blank_values_become_none() {
        let q = extract("/items?page=&search=%20%20&sortBy=").await;
        assert_eq!(q, PaginationQuery::default());
    }

    #[tokio::test]
    async fn test_no_query_string() {
        assert_eq!(extract("/items").await, PaginationQuery::default());
    }

    #[tokio::test]
    async fn test_negative_values_pass_through_for_clamping() {
        let q = extract("/items?page=-4&limit=9999").await;
        assert_eq!(q.options(), PaginationOptions { page: Some(-4), limit: Some(9999) });

        let page = paginate(q.options(), |skip, take| async move {
            assert_eq!((skip, take), (0, 100));
            Ok::<_, String>((Vec::<u8>::new(), 0))
        })
        .await
        .unwrap();
        assert_eq!(page.meta.limit, 100);
    }
}
