use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use futures_util::future::LocalBoxFuture;
use tracing::info;

use crate::core::error::{McdexError, McdexResult};
use crate::core::index::ModIndex;
use crate::core::loaders::ForgeVersion;
use crate::core::pack::curse::mentions_curseforge_host;
use crate::core::pack::{list_packs, InstallReport, ModPack, PackContext};
use crate::core::progress::ProgressEvent;

pub type Handler =
    for<'a> fn(&'a PackContext<'a>, &'a [String]) -> LocalBoxFuture<'a, McdexResult<()>>;

pub enum Action {
    /// Prints the command table; needs no environment.
    Help,
    Run(Handler),
}

/// One entry of the command table.
pub struct Command {
    pub name: &'static str,
    pub usage: &'static str,
    pub summary: &'static str,
    pub min_args: usize,
    pub max_args: usize,
    pub action: Action,
}

impl Command {
    pub fn check_arity(&self, args: &[String]) -> McdexResult<()> {
        if args.len() < self.min_args || args.len() > self.max_args {
            return Err(McdexError::Usage(format!(
                "usage: mcdex {} {}",
                self.name, self.usage
            )));
        }
        Ok(())
    }
}

pub static COMMANDS: &[Command] = &[
    Command {
        name: "createPack",
        usage: "<name> <minecraftVersion> <forgeVersion>",
        summary: "Create a new pack with the given Minecraft and Forge versions",
        min_args: 3,
        max_args: 3,
        action: Action::Run(create_pack),
    },
    Command {
        name: "installPack",
        usage: "<name> <url>",
        summary: "Install a pack from a zip URL",
        min_args: 2,
        max_args: 2,
        action: Action::Run(install_pack),
    },
    Command {
        name: "installLocalPack",
        usage: "<directory>",
        summary: "Install the pack in a local directory ('.' for the current one)",
        min_args: 1,
        max_args: 1,
        action: Action::Run(install_local_pack),
    },
    Command {
        name: "update",
        usage: "",
        summary: "Download the latest mod index",
        min_args: 0,
        max_args: 0,
        action: Action::Run(update),
    },
    Command {
        name: "info",
        usage: "",
        summary: "Show mcdex paths and index status",
        min_args: 0,
        max_args: 0,
        action: Action::Run(show_info),
    },
    Command {
        name: "registerMod",
        usage: "<pack> <curseForgeURL> [<fileID>]",
        summary: "Add a CurseForge mod to a pack",
        min_args: 2,
        max_args: 3,
        action: Action::Run(register_mod),
    },
    Command {
        name: "installMods",
        usage: "<pack>",
        summary: "Download every mod listed in a pack's manifest",
        min_args: 1,
        max_args: 1,
        action: Action::Run(install_mods),
    },
    Command {
        name: "runServer",
        usage: "<pack>",
        summary: "Install the Forge server and mods into a pack directory",
        min_args: 1,
        max_args: 1,
        action: Action::Run(run_server),
    },
    Command {
        name: "installForge",
        usage: "<minecraftVersion> <forgeVersion>",
        summary: "Install a Forge client into the Minecraft directory",
        min_args: 2,
        max_args: 2,
        action: Action::Run(install_forge),
    },
    Command {
        name: "listPacks",
        usage: "",
        summary: "List installed packs",
        min_args: 0,
        max_args: 0,
        action: Action::Run(list),
    },
    Command {
        name: "removeMod",
        usage: "<pack> <projectID>",
        summary: "Remove a mod from a pack's manifest",
        min_args: 2,
        max_args: 2,
        action: Action::Run(remove_mod),
    },
    Command {
        name: "help",
        usage: "",
        summary: "Show this help",
        min_args: 0,
        max_args: 0,
        action: Action::Help,
    },
];

pub fn find(name: &str) -> Option<&'static Command> {
    COMMANDS.iter().find(|c| c.name == name)
}

pub fn usage_text() -> String {
    let mut commands: Vec<&Command> = COMMANDS.iter().collect();
    commands.sort_by_key(|c| c.name);

    let mut out = String::from("usage: mcdex [-v] [-j <jobs>] <command> [<args>]\n\ncommands:\n");
    for c in commands {
        let invocation = format!("{} {}", c.name, c.usage);
        out.push_str(&format!("  {:<58} {}\n", invocation.trim_end(), c.summary));
    }
    out
}

pub fn print_usage() {
    print!("{}", usage_text());
}

fn parse_id(raw: &str, what: &str) -> McdexResult<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| McdexError::Usage(format!("{} must be a number, got '{}'", what, raw)))
}

fn report_install(ctx: &PackContext<'_>, pack: &ModPack, report: &InstallReport) {
    ctx.reporter.report(ProgressEvent::Message(format!(
        "{}: {} downloaded, {} already present, {} skipped",
        pack.name(),
        report.downloaded,
        report.cached,
        report.skipped
    )));
}

fn create_pack<'a>(
    ctx: &'a PackContext<'a>,
    args: &'a [String],
) -> LocalBoxFuture<'a, McdexResult<()>> {
    Box::pin(async move {
        let forge = ForgeVersion::new(&args[1], &args[2]);
        ModPack::create(ctx, &args[0], &forge).await?;
        Ok(())
    })
}

fn install_pack<'a>(
    ctx: &'a PackContext<'a>,
    args: &'a [String],
) -> LocalBoxFuture<'a, McdexResult<()>> {
    Box::pin(async move {
        let mut pack = ModPack::new(ctx.env, &args[0], Some(args[1].as_str()))?;
        pack.download(ctx).await?;
        pack.process_manifest()?;
        pack.create_launcher_profile(ctx).await?;
        let report = pack.install_mods(ctx).await?;
        pack.install_overrides(ctx)?;
        report_install(ctx, &pack, &report);
        Ok(())
    })
}

/// `.` and relative directories resolve against the working directory.
fn local_pack_dir(raw: &str) -> McdexResult<PathBuf> {
    let path = Path::new(raw);
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| McdexError::io(".", e))?;
    Ok(if raw == "." { cwd } else { cwd.join(path) })
}

fn install_local_pack<'a>(
    ctx: &'a PackContext<'a>,
    args: &'a [String],
) -> LocalBoxFuture<'a, McdexResult<()>> {
    Box::pin(async move {
        let dir = local_pack_dir(&args[0])?;
        let mut pack = ModPack::open(ctx.env, &dir.to_string_lossy())?;
        pack.create_launcher_profile(ctx).await?;
        let report = pack.install_mods(ctx).await?;
        report_install(ctx, &pack, &report);
        Ok(())
    })
}

fn update<'a>(ctx: &'a PackContext<'a>, _args: &'a [String]) -> LocalBoxFuture<'a, McdexResult<()>> {
    Box::pin(async move {
        ModIndex::download(ctx.downloader, &ctx.settings.index_url, ctx.env.index_path()).await?;
        ctx.reporter
            .report(ProgressEvent::Message("mod index updated".to_string()));
        Ok(())
    })
}

fn show_info<'a>(
    ctx: &'a PackContext<'a>,
    _args: &'a [String],
) -> LocalBoxFuture<'a, McdexResult<()>> {
    Box::pin(async move {
        println!("{}", ctx.env);
        match ctx.env.index_modified() {
            Some(modified) => {
                let when: DateTime<Local> = modified.into();
                println!("Index updated: {}", when.format("%Y-%m-%d %H:%M:%S %z"));
            }
            None => println!("Index updated: never (run 'mcdex update')"),
        }
        println!("Download workers: {}", ctx.settings.workers());
        Ok(())
    })
}

fn register_mod<'a>(
    ctx: &'a PackContext<'a>,
    args: &'a [String],
) -> LocalBoxFuture<'a, McdexResult<()>> {
    Box::pin(async move {
        let url = &args[1];
        if args.len() < 3 && !mentions_curseforge_host(url) {
            return Err(McdexError::Usage(
                "usage: mcdex registerMod <pack> <url> <fileID> (a file ID is required for non-CurseForge URLs)"
                    .to_string(),
            ));
        }
        let file_id = args.get(2).map(|raw| parse_id(raw, "fileID")).transpose()?;

        let mut pack = ModPack::open(ctx.env, &args[0])?;
        pack.register_mod(ctx, url, file_id)?;
        Ok(())
    })
}

fn install_mods<'a>(
    ctx: &'a PackContext<'a>,
    args: &'a [String],
) -> LocalBoxFuture<'a, McdexResult<()>> {
    Box::pin(async move {
        let mut pack = ModPack::open(ctx.env, &args[0])?;
        let report = pack.install_mods(ctx).await?;
        report_install(ctx, &pack, &report);
        Ok(())
    })
}

fn run_server<'a>(
    ctx: &'a PackContext<'a>,
    args: &'a [String],
) -> LocalBoxFuture<'a, McdexResult<()>> {
    Box::pin(async move {
        let mut pack = ModPack::open(ctx.env, &args[0])?;
        let report = pack.install_server(ctx).await?;
        report_install(ctx, &pack, &report);
        ctx.reporter.report(ProgressEvent::Message(format!(
            "server ready in {}",
            pack.root_path().display()
        )));
        Ok(())
    })
}

fn install_forge<'a>(
    ctx: &'a PackContext<'a>,
    args: &'a [String],
) -> LocalBoxFuture<'a, McdexResult<()>> {
    Box::pin(async move {
        let version = ForgeVersion::new(&args[0], &args[1]);
        let ran = ctx
            .forge
            .install_client(ctx.downloader, &version, ctx.env)
            .await?;
        let msg = if ran {
            format!("installed Forge {}", version)
        } else {
            format!("Forge {} is already installed", version)
        };
        ctx.reporter.report(ProgressEvent::Message(msg));
        Ok(())
    })
}

fn list<'a>(ctx: &'a PackContext<'a>, _args: &'a [String]) -> LocalBoxFuture<'a, McdexResult<()>> {
    Box::pin(async move {
        let packs = list_packs(ctx.env)?;
        if packs.is_empty() {
            println!("No packs in {}", ctx.env.pack_root().display());
        }
        for p in packs {
            println!(
                "{:<24} minecraft {:<10} forge {:<16} {} mod(s)",
                p.name, p.minecraft, p.forge, p.mods
            );
        }
        Ok(())
    })
}

fn remove_mod<'a>(
    ctx: &'a PackContext<'a>,
    args: &'a [String],
) -> LocalBoxFuture<'a, McdexResult<()>> {
    Box::pin(async move {
        let project_id = parse_id(&args[1], "projectID")?;
        let mut pack = ModPack::open(ctx.env, &args[0])?;
        // the index is only consulted for a friendlier name
        let label = ctx
            .open_index()
            .and_then(|index| index.mod_by_id(project_id))
            .map(|entry| format!("{} ({})", entry.name, project_id))
            .unwrap_or_else(|_| project_id.to_string());

        let msg = if pack.remove_mod(project_id)? {
            info!("Removed project {} from {}", project_id, pack.name());
            format!("removed {} from {}", label, pack.name())
        } else {
            format!("{} is not in {}", label, pack.name())
        };
        ctx.reporter.report(ProgressEvent::Message(msg));
        Ok(())
    })
}
