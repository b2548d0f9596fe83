use mockito::Matcher;

use newspaper::geocoding::{LocationData, ReverseGeocoder};

#[tokio::test]
async fn reverse_geocodes_city_region_country() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/reverse")
        .match_header("user-agent", "NewspaperAI-test")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("format".into(), "jsonv2".into()),
            Matcher::UrlEncoded("lat".into(), "30.2672".into()),
            Matcher::UrlEncoded("lon".into(), "-97.7431".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "display_name": "Austin, Travis County, Texas, United States",
                "address": {"city": "Austin", "county": "Travis County", "state": "Texas", "country": "United States"}
            }"#,
        )
        .create_async()
        .await;

    let geocoder = ReverseGeocoder::new(server.url(), "NewspaperAI-test", 5).expect("geocoder");
    let location = geocoder.reverse(30.2672, -97.7431).await.expect("reverse");

    assert_eq!(location.city.as_deref(), Some("Austin"));
    assert_eq!(location.region.as_deref(), Some("Texas"));
    assert_eq!(location.formatted(), "Austin, Texas, United States");
    mock.assert_async().await;
}

#[tokio::test]
async fn town_is_used_when_city_is_missing() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/reverse")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"address": {"town": "Marfa", "state": "Texas", "country": "United States"}}"#)
        .create_async()
        .await;

    let geocoder = ReverseGeocoder::new(server.url(), "NewspaperAI-test", 5).expect("geocoder");
    let location = geocoder.reverse(30.31, -104.02).await.expect("reverse");
    assert_eq!(location.place_name(), Some("Marfa"));
}

#[tokio::test]
async fn failed_lookup_keeps_coordinates() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/reverse")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": "Unable to geocode"}"#)
        .create_async()
        .await;

    let geocoder = ReverseGeocoder::new(server.url(), "NewspaperAI-test", 5).expect("geocoder");
    assert!(geocoder.reverse(0.0, 0.0).await.is_err());

    let bare = LocationData::from_coordinates(0.0, 0.0);
    let resolved = geocoder.resolve(bare.clone()).await;
    assert_eq!(resolved, bare);
    assert_eq!(resolved.formatted(), "0.0000,0.0000");
}
