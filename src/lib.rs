pub mod controller;
pub mod db;
pub mod events;
pub mod feeds;
pub mod lookup;
pub mod models;
pub mod reconcile;
pub mod registry;
pub mod settings;
pub mod store;
pub mod tracker;
pub mod utils;

pub use controller::{Options, TravelMap};
pub use utils::logging::init_logging;

#[cfg(feature = "desktop")]
pub use desktop::run;

#[cfg(feature = "desktop")]
mod desktop {
    use std::{collections::BTreeMap, path::PathBuf};

    use tauri::{Emitter, Manager};

    use crate::{
        controller::{commands::*, Options, TravelMap},
        db::Database,
        events::MapEvent,
        feeds::{FeedKind, FeedLoader, FeedSource},
        lookup::{http_client, ImageResolver, NominatimGeocoder},
        settings::SettingsStore,
        store::LocalStore,
    };

    pub(crate) struct AppState {
        pub(crate) map: TravelMap,
        pub(crate) settings: SettingsStore,
        pub(crate) feeds: FeedLoader,
        pub(crate) geocoder: NominatimGeocoder,
        pub(crate) images: ImageResolver,
        /// Base directory for relative feed paths.
        pub(crate) resource_dir: PathBuf,
    }

    #[cfg_attr(mobile, tauri::mobile_entry_point)]
    pub fn run() {
        crate::init_logging();

        log::info!("Travel map starting up...");

        tauri::Builder::default()
            .plugin(tauri_plugin_opener::init())
            .setup(|app| {
                let result = (|| -> anyhow::Result<()> {
                    let app_data_dir = app
                        .path()
                        .app_data_dir()
                        .map_err(|err| anyhow::anyhow!(err))?;
                    std::fs::create_dir_all(&app_data_dir)?;

                    let resource_dir = app
                        .path()
                        .resource_dir()
                        .map_err(|err| anyhow::anyhow!(err))?;

                    let db_path = app_data_dir.join("travel-map.sqlite3");
                    let database = Database::new(db_path)?;

                    let settings_path = app_data_dir.join("settings.json");
                    let settings_store = SettingsStore::new(settings_path)?;
                    let settings = settings_store.snapshot();

                    let client = http_client(settings.request_timeout_ms)?;
                    let map = tauri::async_runtime::block_on(TravelMap::open(
                        LocalStore::new(database),
                        Options::from(&settings),
                    ));

                    // Forward every map event to the webview.
                    {
                        let app_handle = app.handle().clone();
                        tauri::async_runtime::block_on(map.subscribe(Box::new(
                            move |event: &MapEvent| {
                                if let Err(err) = app_handle.emit(event.channel(), event) {
                                    log::warn!("Failed to emit {}: {err}", event.channel());
                                }
                            },
                        )));
                    }

                    let feed_loader = FeedLoader::new(client.clone());
                    let sources: BTreeMap<FeedKind, FeedSource> = settings
                        .feeds
                        .iter()
                        .map(|(kind, source)| (*kind, source.resolved_against(&resource_dir)))
                        .collect();
                    {
                        let map = map.clone();
                        let loader = feed_loader.clone();
                        tauri::async_runtime::spawn(async move {
                            let loaded = map.load_feeds(&loader, &sources).await;
                            log::info!("Loaded feeds: {loaded:?}");
                        });
                    }

                    app.manage(AppState {
                        map,
                        feeds: feed_loader,
                        geocoder: NominatimGeocoder::new(client.clone(), settings.geocoder.clone()),
                        images: ImageResolver::new(client, settings.images.clone()),
                        settings: settings_store,
                        resource_dir,
                    });

                    Ok(())
                })();

                result.map_err(|err| err.into())
            })
            .invoke_handler(tauri::generate_handler![
                get_view_state,
                get_place_details,
                toggle_visited,
                add_place,
                edit_place,
                delete_place,
                set_checklist_item,
                add_checklist_item,
                add_must_see,
                set_must_see_checked,
                remove_must_see,
                get_category_color,
                set_category_color,
                get_progress,
                select_progress_scope,
                geocode,
                resolve_image,
                get_settings,
                update_settings,
                reload_feeds,
            ])
            .run(tauri::generate_context!())
            .expect("error while running tauri application");
    }
}

#[cfg(feature = "desktop")]
pub(crate) use desktop::AppState;
