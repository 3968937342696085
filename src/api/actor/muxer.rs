/*
 * CoolerControl - monitor and control your cooling and other devices
 * Copyright (c) 2021-2024  Guy Boldon, Eren Simsek and contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! The muxer's own actor loop. Unlike the rest of `api::actor`, this one
//! can't be driven by a plain "recv a message, handle it" loop: the Tick
//! Loop needs a periodic interval, and the Rate-Limited Trigger needs a
//! one-off wakeup at a dynamically computed instant. Both are additional
//! `tokio::select!` arms alongside the message channel.

use std::time::Duration;

use anyhow::Result;
use log::info;
use moro_local::Scope;
use tokio::sync::{mpsc, oneshot};
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::clock::SystemClock;
use crate::error::MuxerError;
use crate::events::MuxerEvent;
use crate::model::{ComponentId, InputInfo, Led, OpaqueImage, Priority};
use crate::muxer::MuxerCore;

const CHANNEL_CAPACITY: usize = 64;

enum MuxerMessage {
    Register {
        priority: Priority,
        component_id: ComponentId,
        origin: String,
        owner: String,
        smooth_cfg: u32,
    },
    SetColorInput {
        priority: Priority,
        colors: Vec<Led>,
        timeout_ms: i64,
        respond_to: oneshot::Sender<Result<(), MuxerError>>,
    },
    SetImageInput {
        priority: Priority,
        image: OpaqueImage,
        timeout_ms: i64,
        respond_to: oneshot::Sender<Result<(), MuxerError>>,
    },
    SetInactive {
        priority: Priority,
        respond_to: oneshot::Sender<Result<(), MuxerError>>,
    },
    Clear {
        priority: Priority,
        respond_to: oneshot::Sender<Result<(), MuxerError>>,
    },
    ClearAll {
        force: bool,
    },
    SetManualPriority {
        priority: Priority,
        respond_to: oneshot::Sender<bool>,
    },
    SetAutoSelect {
        enabled: bool,
        update: bool,
        respond_to: oneshot::Sender<Result<bool, MuxerError>>,
    },
    GetVisible {
        respond_to: oneshot::Sender<InputInfo>,
    },
    GetPriorities {
        respond_to: oneshot::Sender<Vec<Priority>>,
    },
    GetInputInfo {
        priority: Priority,
        respond_to: oneshot::Sender<Option<InputInfo>>,
    },
    UpdateLedCount {
        count: usize,
    },
    Subscribe {
        respond_to: oneshot::Sender<tokio::sync::broadcast::Receiver<MuxerEvent>>,
    },
}

struct MuxerActor {
    receiver: mpsc::Receiver<MuxerMessage>,
    core: MuxerCore<SystemClock>,
}

impl MuxerActor {
    fn new(receiver: mpsc::Receiver<MuxerMessage>, core: MuxerCore<SystemClock>) -> Self {
        Self { receiver, core }
    }

    fn handle_message(&mut self, msg: MuxerMessage) {
        match msg {
            MuxerMessage::Register {
                priority,
                component_id,
                origin,
                owner,
                smooth_cfg,
            } => {
                self.core
                    .register(priority, component_id, origin, owner, smooth_cfg);
            }
            MuxerMessage::SetColorInput {
                priority,
                colors,
                timeout_ms,
                respond_to,
            } => {
                let result = self.core.set_color_input(priority, colors, timeout_ms);
                let _ = respond_to.send(result);
            }
            MuxerMessage::SetImageInput {
                priority,
                image,
                timeout_ms,
                respond_to,
            } => {
                let result = self.core.set_image_input(priority, image, timeout_ms);
                let _ = respond_to.send(result);
            }
            MuxerMessage::SetInactive {
                priority,
                respond_to,
            } => {
                let result = self.core.set_inactive(priority);
                let _ = respond_to.send(result);
            }
            MuxerMessage::Clear {
                priority,
                respond_to,
            } => {
                let result = self.core.clear(priority);
                let _ = respond_to.send(result);
            }
            MuxerMessage::ClearAll { force } => {
                self.core.clear_all(force);
            }
            MuxerMessage::SetManualPriority {
                priority,
                respond_to,
            } => {
                let result = self.core.set_manual_priority(priority);
                let _ = respond_to.send(result);
            }
            MuxerMessage::SetAutoSelect {
                enabled,
                update,
                respond_to,
            } => {
                let result = self.core.set_auto_select(enabled, update);
                let _ = respond_to.send(result);
            }
            MuxerMessage::GetVisible { respond_to } => {
                let _ = respond_to.send(self.core.get_visible());
            }
            MuxerMessage::GetPriorities { respond_to } => {
                let _ = respond_to.send(self.core.get_priorities());
            }
            MuxerMessage::GetInputInfo {
                priority,
                respond_to,
            } => {
                let _ = respond_to.send(self.core.get_input_info(priority));
            }
            MuxerMessage::UpdateLedCount { count } => {
                self.core.update_led_count(count);
            }
            MuxerMessage::Subscribe { respond_to } => {
                let _ = respond_to.send(self.core.subscribe());
            }
        }
    }

    /// Runs until `cancel_token` fires or the sender side is dropped.
    /// Grounded on the generic `run_api_actor` loop, with two extra arms:
    /// the Tick Loop's interval, and a one-off wakeup for a pending
    /// deferred Rate-Limited Trigger check.
    async fn run(mut self, cancel_token: CancellationToken, tick_period: Duration) {
        let mut tick_interval = time::interval(tick_period);
        let mut next_trigger_wakeup: Option<std::time::Instant> = None;
        loop {
            tokio::select! {
                () = cancel_token.cancelled() => break,
                Some(msg) = self.receiver.recv() => {
                    self.handle_message(msg);
                }
                _ = tick_interval.tick() => {
                    next_trigger_wakeup = self.core.tick(std::time::Instant::now());
                }
                () = wait_until(next_trigger_wakeup), if next_trigger_wakeup.is_some() => {
                    next_trigger_wakeup = self.core.trigger_deferred_elapsed(std::time::Instant::now());
                }
                else => break,
            }
        }
        info!("MuxerActor is shutting down");
    }
}

async fn wait_until(instant: Option<std::time::Instant>) {
    match instant {
        Some(instant) => time::sleep_until(instant.into()).await,
        None => std::future::pending().await,
    }
}

#[derive(Clone)]
pub struct MuxerHandle {
    sender: mpsc::Sender<MuxerMessage>,
}

impl MuxerHandle {
    pub fn new<'s>(
        core: MuxerCore<SystemClock>,
        tick_period: Duration,
        cancel_token: CancellationToken,
        main_scope: &'s Scope<'s, 's, Result<()>>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        let actor = MuxerActor::new(receiver, core);
        main_scope.spawn(actor.run(cancel_token, tick_period));
        Self { sender }
    }

    pub async fn register(
        &self,
        priority: Priority,
        component_id: ComponentId,
        origin: String,
        owner: String,
        smooth_cfg: u32,
    ) {
        let msg = MuxerMessage::Register {
            priority,
            component_id,
            origin,
            owner,
            smooth_cfg,
        };
        let _ = self.sender.send(msg).await;
    }

    pub async fn set_color_input(
        &self,
        priority: Priority,
        colors: Vec<Led>,
        timeout_ms: i64,
    ) -> Result<(), MuxerError> {
        let (tx, rx) = oneshot::channel();
        let msg = MuxerMessage::SetColorInput {
            priority,
            colors,
            timeout_ms,
            respond_to: tx,
        };
        let _ = self.sender.send(msg).await;
        rx.await.unwrap_or(Err(MuxerError::UnregisteredPriority { priority }))
    }

    pub async fn set_image_input(
        &self,
        priority: Priority,
        image: OpaqueImage,
        timeout_ms: i64,
    ) -> Result<(), MuxerError> {
        let (tx, rx) = oneshot::channel();
        let msg = MuxerMessage::SetImageInput {
            priority,
            image,
            timeout_ms,
            respond_to: tx,
        };
        let _ = self.sender.send(msg).await;
        rx.await.unwrap_or(Err(MuxerError::UnregisteredPriority { priority }))
    }

    pub async fn set_inactive(&self, priority: Priority) -> Result<(), MuxerError> {
        let (tx, rx) = oneshot::channel();
        let msg = MuxerMessage::SetInactive {
            priority,
            respond_to: tx,
        };
        let _ = self.sender.send(msg).await;
        rx.await.unwrap_or(Err(MuxerError::UnregisteredPriority { priority }))
    }

    pub async fn clear(&self, priority: Priority) -> Result<(), MuxerError> {
        let (tx, rx) = oneshot::channel();
        let msg = MuxerMessage::Clear {
            priority,
            respond_to: tx,
        };
        let _ = self.sender.send(msg).await;
        rx.await.unwrap_or(Err(MuxerError::InvalidClearTarget { priority }))
    }

    pub async fn clear_all(&self, force: bool) {
        let _ = self.sender.send(MuxerMessage::ClearAll { force }).await;
    }

    pub async fn set_manual_priority(&self, priority: Priority) -> bool {
        let (tx, rx) = oneshot::channel();
        let msg = MuxerMessage::SetManualPriority {
            priority,
            respond_to: tx,
        };
        let _ = self.sender.send(msg).await;
        rx.await.unwrap_or(false)
    }

    pub async fn set_auto_select(&self, enabled: bool, update: bool) -> Result<bool, MuxerError> {
        let (tx, rx) = oneshot::channel();
        let msg = MuxerMessage::SetAutoSelect {
            enabled,
            update,
            respond_to: tx,
        };
        let _ = self.sender.send(msg).await;
        rx.await
            .unwrap_or(Err(MuxerError::InvalidManualPin { priority: 0 }))
    }

    pub async fn get_visible(&self) -> InputInfo {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .sender
            .send(MuxerMessage::GetVisible { respond_to: tx })
            .await;
        rx.await.unwrap_or_else(|_| InputInfo::background(0))
    }

    pub async fn get_priorities(&self) -> Vec<Priority> {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .sender
            .send(MuxerMessage::GetPriorities { respond_to: tx })
            .await;
        rx.await.unwrap_or_default()
    }

    pub async fn get_input_info(&self, priority: Priority) -> Option<InputInfo> {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .sender
            .send(MuxerMessage::GetInputInfo {
                priority,
                respond_to: tx,
            })
            .await;
        rx.await.ok().flatten()
    }

    pub async fn update_led_count(&self, count: usize) {
        let _ = self
            .sender
            .send(MuxerMessage::UpdateLedCount { count })
            .await;
    }

    pub async fn subscribe(&self) -> Option<tokio::sync::broadcast::Receiver<MuxerEvent>> {
        let (tx, rx) = oneshot::channel();
        let _ = self
            .sender
            .send(MuxerMessage::Subscribe { respond_to: tx })
            .await;
        rx.await.ok()
    }
}
