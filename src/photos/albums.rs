use crate::{
    catalog,
    error::ClientError,
    photos::{GooglePhotosClient, check},
    types::{Album, CreateAlbumRequest, ListAlbumsResponse, NewAlbum},
};

const PAGE_SIZE: &str = "50";

/// Reuses an app-created album with the same title, otherwise creates one.
///
/// Listing needs the `appcreateddata` read scope. Without it the lookup is
/// skipped and a new album is created.
pub(super) async fn create_album_if_absent(
    client: &GooglePhotosClient,
    album_name: &str,
) -> Result<String, ClientError> {
    let title = catalog::truncate_album_name(album_name);

    match find_album(client, &title).await {
        Ok(Some(album)) => {
            tracing::info!(title = %title, album_id = %album.id, "reusing existing album");
            return Ok(album.id);
        }
        Ok(None) => {}
        Err(ClientError::Api { status, .. }) if status == 401 || status == 403 => {
            tracing::warn!(status, "cannot list albums, creating without lookup");
        }
        Err(e) => return Err(e),
    }

    create_album(client, &title).await
}

async fn find_album(client: &GooglePhotosClient, title: &str) -> Result<Option<Album>, ClientError> {
    let url = client.endpoint("albums");
    let url = url.as_str();
    let mut page_token: Option<String> = None;

    loop {
        let token = page_token.as_deref();
        let page: ListAlbumsResponse = client
            .with_retry("list_albums", || async move {
                let mut request = client
                    .http
                    .get(url)
                    .bearer_auth(&client.access_token)
                    .query(&[("pageSize", PAGE_SIZE), ("excludeNonAppCreatedData", "true")]);
                if let Some(token) = token {
                    request = request.query(&[("pageToken", token)]);
                }

                let response = request.send().await?;
                Ok(check(response).await?.json::<ListAlbumsResponse>().await?)
            })
            .await?;

        if let Some(album) = page.albums.into_iter().find(|a| a.title == title) {
            return Ok(Some(album));
        }

        match page.next_page_token {
            Some(next) if !next.is_empty() => page_token = Some(next),
            _ => return Ok(None),
        }
    }
}

async fn create_album(client: &GooglePhotosClient, title: &str) -> Result<String, ClientError> {
    let url = client.endpoint("albums");
    let url = url.as_str();
    let request = CreateAlbumRequest {
        album: NewAlbum {
            title: title.to_string(),
        },
    };
    let request = &request;

    let album: Album = client
        .with_retry("create_album", || async move {
            let response = client
                .http
                .post(url)
                .bearer_auth(&client.access_token)
                .json(request)
                .send()
                .await?;
            Ok(check(response).await?.json::<Album>().await?)
        })
        .await?;

    if album.id.is_empty() {
        return Err(ClientError::InvalidResponse(
            "album creation returned no id".to_string(),
        ));
    }

    tracing::info!(title = %title, album_id = %album.id, "album created");
    Ok(album.id)
}
