use std::sync::Arc;

use bevy::prelude::*;
use bevy::tasks::{IoTaskPool, Task};

use bundle_claim::claim::{BundleClaim, ClaimResult};
use bundle_claim::config::DappSettings;
use bundle_claim::error::ClaimError;
use bundle_claim::model::AssetRecord;
use bundle_claim::networks::{ellipsis_text, network_name, to_checksum_address};
use bundle_claim::services::{
    DappClient, EventLookup, NftInventory, Notification, NotificationLevel, NotificationSink,
    TransactionExecutor,
};
use bundle_claim::wallet::{KeychainManager, resolve_wallet_address};

const NORMAL_BUTTON: Color = Color::srgb(0.15, 0.15, 0.15);
const HOVERED_BUTTON: Color = Color::srgb(0.25, 0.25, 0.25);
const PRESSED_BUTTON: Color = Color::srgb(0.35, 0.35, 0.35);
const CLAIM_BUTTON: Color = Color::srgb(0.45, 0.2, 0.7);
const DISABLED_BUTTON: Color = Color::srgb(0.3, 0.3, 0.3);
const HIGHLIGHTED_ITEM: Color = Color::srgb(0.3, 0.2, 0.5);

const TOAST_SECONDS: f32 = 8.0;

// UI Components
#[derive(Component)]
struct PickButton;

#[derive(Component)]
struct ClaimButton;

#[derive(Component)]
struct ClaimButtonText;

#[derive(Component)]
struct IdentifierInput;

#[derive(Component)]
struct IdentifierText;

#[derive(Component)]
struct SelectedText;

#[derive(Component)]
struct PickerModal;

#[derive(Component)]
struct PickerItem(usize);

#[derive(Component)]
struct PickerConfirmButton;

#[derive(Component)]
struct PickerCancelButton;

#[derive(Component)]
struct ToastArea;

// Resources
#[derive(Resource)]
struct ClaimServices {
    lookup: Arc<dyn EventLookup>,
    executor: Arc<dyn TransactionExecutor>,
    inventory: Arc<dyn NftInventory>,
}

#[derive(Resource)]
struct StartupIssue(String);

#[derive(Resource, Default)]
struct PickerState {
    bundles: Vec<AssetRecord>,
    highlighted: Option<usize>,
    error: Option<String>,
}

#[derive(Resource, Default)]
struct IdentifierFocus(bool);

#[derive(Resource, Default)]
struct AsyncTasks {
    inventory_task: Option<Task<Result<Vec<AssetRecord>, ClaimError>>>,
    claim_task: Option<Task<ClaimResult>>,
}

struct Toast {
    notification: Notification,
    timer: Timer,
}

/// Notification sink backed by on-screen toasts.
#[derive(Resource, Default)]
struct NotificationCenter {
    toasts: Vec<Toast>,
}

impl NotificationSink for NotificationCenter {
    fn notify(&mut self, notification: Notification) {
        match notification.level {
            NotificationLevel::Error => {
                error!("🔔 {}: {}", notification.title, notification.message)
            }
            NotificationLevel::Warning => {
                warn!("🔔 {}: {}", notification.title, notification.message)
            }
            NotificationLevel::Success => {
                info!("🔔 {}: {}", notification.title, notification.message)
            }
        }
        self.toasts.push(Toast {
            notification,
            timer: Timer::from_seconds(TOAST_SECONDS, TimerMode::Once),
        });
    }
}

fn main() {
    App::new()
        .add_plugins(DefaultPlugins)
        .add_plugins(BundleClaimPlugin)
        .run();
}

pub struct BundleClaimPlugin;

impl Plugin for BundleClaimPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(NotificationCenter::default())
            .insert_resource(PickerState::default())
            .insert_resource(AsyncTasks::default())
            .insert_resource(IdentifierFocus::default());

        match load_claim_resources() {
            Ok((claim, services)) => {
                app.insert_resource(claim).insert_resource(services);
            }
            Err(issue) => {
                app.insert_resource(StartupIssue(issue));
            }
        }

        app.add_systems(
            Startup,
            (
                setup_ui,
                report_startup_issue.run_if(resource_exists::<StartupIssue>),
                spawn_claim_panel.run_if(resource_exists::<BundleClaim>),
            )
                .chain(),
        )
        .add_systems(
            Update,
            (
                pick_button_system,
                picker_interaction_system,
                identifier_input_system,
                claim_button_system,
                async_task_polling_system,
                panel_text_system,
                claim_button_color_system,
                picker_render_system,
            )
                .chain()
                .run_if(resource_exists::<BundleClaim>),
        )
        .add_systems(Update, (button_feedback_system, toast_system));
    }
}

fn load_claim_resources() -> Result<(BundleClaim, ClaimServices), String> {
    let settings = DappSettings::from_env().map_err(|e| e.to_string())?;

    let keychain = KeychainManager::from_settings(&settings);
    let wallet_address = resolve_wallet_address(&settings, &keychain)
        .map_err(|e| {
            format!("{}. Set wallet_address in the settings file or store a wallet first.", e)
        })?;

    let context = settings.dapp_context(&wallet_address).map_err(|e| e.to_string())?;
    let client = Arc::new(DappClient::new(&settings).map_err(|e| e.to_string())?);

    info!(
        "Bundle claim ready on {} ({}) for {}",
        network_name(context.chain_id),
        context.chain_id,
        wallet_address
    );

    let services = ClaimServices {
        lookup: client.clone(),
        executor: client.clone(),
        inventory: client,
    };
    Ok((BundleClaim::new(context), services))
}

fn setup_ui(mut commands: Commands) {
    // UI Camera
    commands.spawn(Camera2d);

    commands.spawn((
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(20.0),
            right: Val::Px(20.0),
            width: Val::Px(380.0),
            flex_direction: FlexDirection::Column,
            row_gap: Val::Px(10.0),
            ..default()
        },
        GlobalZIndex(20),
        ToastArea,
    ));
}

fn report_startup_issue(mut commands: Commands, issue: Res<StartupIssue>) {
    error!("Bundle claim unavailable: {}", issue.0);

    commands
        .spawn((
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                align_items: AlignItems::Center,
                justify_content: JustifyContent::Center,
                ..default()
            },
            BackgroundColor(Color::srgb(0.1, 0.1, 0.1)),
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new("⚠️ Bundle claim unavailable"),
                Node {
                    margin: UiRect::bottom(Val::Px(20.0)),
                    ..default()
                },
            ));
            parent.spawn((
                Text::new(issue.0.clone()),
                Node {
                    max_width: Val::Px(600.0),
                    ..default()
                },
            ));
        });
}

fn button_node(width: f32, height: f32) -> Node {
    Node {
        width: Val::Px(width),
        height: Val::Px(height),
        border: UiRect::all(Val::Px(2.0)),
        justify_content: JustifyContent::Center,
        align_items: AlignItems::Center,
        margin: UiRect::all(Val::Px(10.0)),
        ..default()
    }
}

fn spawn_claim_panel(mut commands: Commands, claim: Res<BundleClaim>) {
    let context = claim.context();
    let wallet_label = format!(
        "{} | {}",
        network_name(context.chain_id),
        ellipsis_text(&to_checksum_address(&context.wallet_address), 6)
    );

    commands
        .spawn((
            Node {
                display: Display::Flex,
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                align_items: AlignItems::Center,
                justify_content: JustifyContent::Center,
                ..default()
            },
            BackgroundColor(Color::srgb(0.1, 0.1, 0.1)),
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new("Unpack your Bundle"),
                Node {
                    margin: UiRect::bottom(Val::Px(10.0)),
                    ..default()
                },
            ));
            parent.spawn((
                Text::new(wallet_label),
                Node {
                    margin: UiRect::bottom(Val::Px(20.0)),
                    ..default()
                },
            ));

            parent
                .spawn((
                    Button,
                    PickButton,
                    button_node(220.0, 50.0),
                    BorderColor(Color::BLACK),
                    BorderRadius::MAX,
                    BackgroundColor(NORMAL_BUTTON),
                ))
                .with_child(Text::new("PICK AN NFT"));

            parent.spawn((
                Text::new("💡 Pick the bundle that you'd like to unpack."),
                TextFont {
                    font_size: 14.0,
                    ..default()
                },
            ));

            parent.spawn((
                Text::new("or"),
                Node {
                    margin: UiRect::vertical(Val::Px(15.0)),
                    ..default()
                },
            ));

            parent.spawn(Text::new("ENTER BUNDLE ID"));

            parent
                .spawn((
                    Button,
                    IdentifierInput,
                    Node {
                        width: Val::Px(260.0),
                        height: Val::Px(40.0),
                        border: UiRect::all(Val::Px(2.0)),
                        justify_content: JustifyContent::FlexStart,
                        align_items: AlignItems::Center,
                        padding: UiRect::all(Val::Px(10.0)),
                        margin: UiRect::all(Val::Px(10.0)),
                        ..default()
                    },
                    BorderColor(Color::WHITE),
                    BackgroundColor(Color::srgb(0.2, 0.2, 0.2)),
                ))
                .with_children(|parent| {
                    parent.spawn((Text::new("0"), IdentifierText));
                });

            parent.spawn((Text::new(""), SelectedText));

            parent
                .spawn((
                    Button,
                    ClaimButton,
                    button_node(260.0, 50.0),
                    BorderColor(Color::BLACK),
                    BorderRadius::MAX,
                    BackgroundColor(CLAIM_BUTTON),
                ))
                .with_children(|parent| {
                    parent.spawn((Text::new("CLAIM YOUR BUNDLE"), ClaimButtonText));
                });
        });
}

fn pick_button_system(
    query: Query<&Interaction, (Changed<Interaction>, With<PickButton>)>,
    mut claim: ResMut<BundleClaim>,
    mut picker_state: ResMut<PickerState>,
    mut async_tasks: ResMut<AsyncTasks>,
    mut focus: ResMut<IdentifierFocus>,
    services: Res<ClaimServices>,
) {
    for interaction in &query {
        if *interaction != Interaction::Pressed {
            continue;
        }

        claim.open_picker();
        if !claim.is_picker_visible() {
            continue;
        }
        focus.0 = false;
        *picker_state = PickerState::default();

        // Keeps showing the loader when an earlier fetch has not returned yet
        if claim.request_inventory() {
            let inventory = Arc::clone(&services.inventory);
            let owner = claim.context().wallet_address.clone();
            let chain = claim.context().chain_id;
            let factory = claim.context().default_factory_address.clone();

            info!("Loading bundles owned by {}", owner);
            async_tasks.inventory_task = Some(IoTaskPool::get().spawn(async move {
                inventory.owned_bundles(&owner, chain, Some(factory.as_str()))
            }));
        }
    }
}

fn picker_interaction_system(
    item_query: Query<(&Interaction, &PickerItem), Changed<Interaction>>,
    confirm_query: Query<&Interaction, (Changed<Interaction>, With<PickerConfirmButton>)>,
    cancel_query: Query<&Interaction, (Changed<Interaction>, With<PickerCancelButton>)>,
    mut picker_state: ResMut<PickerState>,
    mut claim: ResMut<BundleClaim>,
) {
    for (interaction, item) in &item_query {
        if *interaction == Interaction::Pressed {
            picker_state.highlighted = Some(item.0);
        }
    }

    for interaction in &confirm_query {
        if *interaction == Interaction::Pressed {
            // Single selection: at most one record goes back
            let selection: Vec<AssetRecord> = picker_state
                .highlighted
                .and_then(|index| picker_state.bundles.get(index).cloned())
                .into_iter()
                .collect();
            claim.on_picker_confirm(selection);
        }
    }

    for interaction in &cancel_query {
        if *interaction == Interaction::Pressed {
            claim.close_picker();
        }
    }
}

fn key_to_digit(key_code: KeyCode) -> Option<char> {
    match key_code {
        KeyCode::Digit0 | KeyCode::Numpad0 => Some('0'),
        KeyCode::Digit1 | KeyCode::Numpad1 => Some('1'),
        KeyCode::Digit2 | KeyCode::Numpad2 => Some('2'),
        KeyCode::Digit3 | KeyCode::Numpad3 => Some('3'),
        KeyCode::Digit4 | KeyCode::Numpad4 => Some('4'),
        KeyCode::Digit5 | KeyCode::Numpad5 => Some('5'),
        KeyCode::Digit6 | KeyCode::Numpad6 => Some('6'),
        KeyCode::Digit7 | KeyCode::Numpad7 => Some('7'),
        KeyCode::Digit8 | KeyCode::Numpad8 => Some('8'),
        KeyCode::Digit9 | KeyCode::Numpad9 => Some('9'),
        _ => None,
    }
}

fn identifier_input_system(
    input_query: Query<&Interaction, (Changed<Interaction>, With<IdentifierInput>)>,
    mut focus: ResMut<IdentifierFocus>,
    keyboard_input: Res<ButtonInput<KeyCode>>,
    mouse_input: Res<ButtonInput<MouseButton>>,
    mut claim: ResMut<BundleClaim>,
) {
    let mut clicked_input = false;
    for interaction in &input_query {
        if *interaction == Interaction::Pressed {
            clicked_input = true;
            if !focus.0 {
                focus.0 = true;
            }
        }
    }
    // Clicking anywhere else drops focus
    if !clicked_input && focus.0 && mouse_input.just_pressed(MouseButton::Left) {
        focus.0 = false;
    }

    if !focus.0 || claim.is_claiming() || claim.is_picker_visible() {
        return;
    }

    let mut value = claim.bundle_id().unwrap_or_default().to_string();
    let mut changed = false;

    if keyboard_input.just_pressed(KeyCode::Backspace)
        || keyboard_input.just_pressed(KeyCode::Delete)
    {
        changed |= value.pop().is_some();
    }
    for key_code in keyboard_input.get_just_pressed() {
        if let Some(digit) = key_to_digit(*key_code) {
            value.push(digit);
            changed = true;
        }
    }

    if changed {
        claim.set_identifier(value);
    }
}

fn claim_button_system(
    query: Query<&Interaction, (Changed<Interaction>, With<ClaimButton>)>,
    mut claim: ResMut<BundleClaim>,
    mut async_tasks: ResMut<AsyncTasks>,
    mut focus: ResMut<IdentifierFocus>,
    services: Res<ClaimServices>,
) {
    for interaction in &query {
        if *interaction != Interaction::Pressed {
            continue;
        }

        match claim.begin_claim() {
            Ok(job) => {
                focus.0 = false;
                let lookup = Arc::clone(&services.lookup);
                let executor = Arc::clone(&services.executor);

                async_tasks.claim_task = Some(IoTaskPool::get().spawn(async move {
                    job.run(lookup.as_ref(), executor.as_ref())
                }));
            }
            Err(e) => {
                warn!("Claim not started: {}", e);
            }
        }
    }
}

fn async_task_polling_system(
    mut async_tasks: ResMut<AsyncTasks>,
    mut claim: ResMut<BundleClaim>,
    mut picker_state: ResMut<PickerState>,
    mut notifications: ResMut<NotificationCenter>,
) {
    // Poll inventory task
    if let Some(task) = async_tasks.inventory_task.as_mut() {
        if let Some(result) = bevy::tasks::block_on(bevy::tasks::poll_once(task)) {
            async_tasks.inventory_task = None;
            claim.finish_inventory_load();

            match result {
                Ok(bundles) => {
                    info!("Picker loaded {} bundle(s)", bundles.len());
                    picker_state.bundles = bundles;
                    picker_state.error = None;
                }
                Err(e) => {
                    error!("Failed to load bundles: {}", e);
                    picker_state.error = Some(e.to_string());
                    notifications.notify(Notification::new(
                        NotificationLevel::Warning,
                        "Bundles unavailable",
                        "Your bundles could not be loaded. You can still enter a bundle id.",
                    ));
                }
            }
        }
    }

    // Poll claim task
    if let Some(task) = async_tasks.claim_task.as_mut() {
        if let Some(result) = bevy::tasks::block_on(bevy::tasks::poll_once(task)) {
            async_tasks.claim_task = None;
            let outcome = claim.finish_claim(result, &mut *notifications);
            info!("Claim finished: {:?}", outcome);
        }
    }
}

fn panel_text_system(
    claim: Res<BundleClaim>,
    focus: Res<IdentifierFocus>,
    mut text_queries: ParamSet<(
        Query<&mut Text, With<IdentifierText>>,
        Query<&mut Text, With<SelectedText>>,
        Query<&mut Text, With<ClaimButtonText>>,
    )>,
) {
    if !claim.is_changed() && !focus.is_changed() {
        return;
    }

    let identifier = match claim.bundle_id() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ if focus.0 => String::new(),
        _ => "0".to_string(),
    };
    if let Ok(mut text) = text_queries.p0().get_single_mut() {
        *text = Text::new(if focus.0 { format!("{}|", identifier) } else { identifier });
    }

    if let Ok(mut text) = text_queries.p1().get_single_mut() {
        *text = Text::new(claim.display_text().unwrap_or_default());
    }

    if let Ok(mut text) = text_queries.p2().get_single_mut() {
        *text = Text::new(if claim.is_claiming() {
            "CLAIMING..."
        } else {
            "CLAIM YOUR BUNDLE"
        });
    }
}

fn claim_button_color_system(
    claim: Res<BundleClaim>,
    mut query: Query<&mut BackgroundColor, With<ClaimButton>>,
) {
    if !claim.is_changed() {
        return;
    }
    for mut color in &mut query {
        *color = BackgroundColor(if claim.is_claiming() { DISABLED_BUTTON } else { CLAIM_BUTTON });
    }
}

fn picker_render_system(
    mut commands: Commands,
    claim: Res<BundleClaim>,
    picker_state: Res<PickerState>,
    modal_query: Query<Entity, With<PickerModal>>,
) {
    if !claim.is_changed() && !picker_state.is_changed() {
        return;
    }

    for entity in &modal_query {
        commands.entity(entity).despawn_recursive();
    }
    if !claim.is_picker_visible() {
        return;
    }

    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                align_items: AlignItems::Center,
                justify_content: JustifyContent::Center,
                ..default()
            },
            BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.7)),
            GlobalZIndex(10),
            PickerModal,
        ))
        .with_children(|overlay| {
            overlay
                .spawn((
                    Node {
                        width: Val::Px(520.0),
                        flex_direction: FlexDirection::Column,
                        align_items: AlignItems::Center,
                        padding: UiRect::all(Val::Px(20.0)),
                        ..default()
                    },
                    BackgroundColor(Color::srgb(0.12, 0.12, 0.15)),
                    BorderRadius::all(Val::Px(8.0)),
                ))
                .with_children(|parent| {
                    parent.spawn((
                        Text::new("Pick your bundle"),
                        Node {
                            margin: UiRect::bottom(Val::Px(15.0)),
                            ..default()
                        },
                    ));

                    if claim.is_confirm_loading() {
                        parent.spawn(Text::new("🔄 Loading your bundles..."));
                    } else if let Some(error) = &picker_state.error {
                        parent.spawn(Text::new(format!("❌ Error: {}", error)));
                    } else if picker_state.bundles.is_empty() {
                        parent.spawn(Text::new("No bundles found in this wallet"));
                    }

                    for (index, bundle) in picker_state.bundles.iter().enumerate() {
                        let highlighted = picker_state.highlighted == Some(index);
                        parent
                            .spawn((
                                Button,
                                PickerItem(index),
                                Node {
                                    width: Val::Percent(100.0),
                                    padding: UiRect::all(Val::Px(8.0)),
                                    margin: UiRect::vertical(Val::Px(3.0)),
                                    border: UiRect::all(Val::Px(2.0)),
                                    ..default()
                                },
                                BorderColor(if highlighted { Color::WHITE } else { Color::BLACK }),
                                BackgroundColor(if highlighted {
                                    HIGHLIGHTED_ITEM
                                } else {
                                    NORMAL_BUTTON
                                }),
                            ))
                            .with_child(Text::new(format!(
                                "{}  ({})",
                                bundle.label(),
                                ellipsis_text(&bundle.token_address, 6)
                            )));
                    }

                    parent
                        .spawn(Node {
                            flex_direction: FlexDirection::Row,
                            margin: UiRect::top(Val::Px(15.0)),
                            ..default()
                        })
                        .with_children(|row| {
                            row.spawn((
                                Button,
                                PickerConfirmButton,
                                button_node(140.0, 40.0),
                                BorderColor(Color::BLACK),
                                BackgroundColor(NORMAL_BUTTON),
                            ))
                            .with_child(Text::new("OK"));
                            row.spawn((
                                Button,
                                PickerCancelButton,
                                button_node(140.0, 40.0),
                                BorderColor(Color::BLACK),
                                BackgroundColor(NORMAL_BUTTON),
                            ))
                            .with_child(Text::new("Cancel"));
                        });
                });
        });
}

fn button_feedback_system(
    mut interaction_query: Query<
        (&Interaction, &mut BackgroundColor, &mut BorderColor, Has<ClaimButton>),
        (Changed<Interaction>, With<Button>, Without<PickerItem>, Without<IdentifierInput>),
    >,
    claim: Option<Res<BundleClaim>>,
) {
    let claiming = claim.map(|claim| claim.is_claiming()).unwrap_or(false);

    for (interaction, mut color, mut border_color, is_claim_button) in &mut interaction_query {
        if is_claim_button && claiming {
            *color = DISABLED_BUTTON.into();
            continue;
        }
        let idle = if is_claim_button { CLAIM_BUTTON } else { NORMAL_BUTTON };
        match *interaction {
            Interaction::Pressed => {
                *color = PRESSED_BUTTON.into();
                border_color.0 = Color::srgb(1.0, 0.0, 0.0);
            }
            Interaction::Hovered => {
                *color = HOVERED_BUTTON.into();
                border_color.0 = Color::WHITE;
            }
            Interaction::None => {
                *color = idle.into();
                border_color.0 = Color::BLACK;
            }
        }
    }
}

fn toast_level_color(level: NotificationLevel) -> Color {
    match level {
        NotificationLevel::Success => Color::srgb(0.15, 0.45, 0.2),
        NotificationLevel::Warning => Color::srgb(0.55, 0.45, 0.1),
        NotificationLevel::Error => Color::srgb(0.55, 0.15, 0.15),
    }
}

fn toast_system(
    mut commands: Commands,
    time: Res<Time>,
    mut center: ResMut<NotificationCenter>,
    area_query: Query<Entity, With<ToastArea>>,
) {
    let toasts = &mut center.bypass_change_detection().toasts;
    for toast in toasts.iter_mut() {
        toast.timer.tick(time.delta());
    }
    let before = toasts.len();
    toasts.retain(|toast| !toast.timer.finished());
    let expired = toasts.len() != before;

    if !expired && !center.is_changed() {
        return;
    }

    for entity in &area_query {
        commands.entity(entity).despawn_descendants();
        commands.entity(entity).with_children(|parent| {
            for toast in &center.toasts {
                let notification = &toast.notification;
                parent
                    .spawn((
                        Node {
                            flex_direction: FlexDirection::Column,
                            padding: UiRect::all(Val::Px(12.0)),
                            ..default()
                        },
                        BackgroundColor(toast_level_color(notification.level)),
                        BorderRadius::all(Val::Px(6.0)),
                    ))
                    .with_children(|toast_node| {
                        toast_node.spawn(Text::new(notification.title.clone()));
                        toast_node.spawn((
                            Text::new(notification.message.clone()),
                            TextFont {
                                font_size: 14.0,
                                ..default()
                            },
                        ));
                        if let Some(link) = &notification.link {
                            toast_node.spawn((
                                Text::new(format!("🔎 View in explorer: {}", link)),
                                TextFont {
                                    font_size: 12.0,
                                    ..default()
                                },
                            ));
                        }
                    });
            }
        });
    }
}
