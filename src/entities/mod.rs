pub mod bank;
pub mod company;
pub mod game;
pub mod game_album_artist;
pub mod game_tag;
pub mod game_tag_link;
pub mod person;
pub mod person_product;
pub mod product;
pub mod song;
pub mod song_arranger;
pub mod song_composer;
pub mod sound_source;
pub mod sound_source_discoverer;
pub mod sound_source_game;
pub mod sound_source_song;
pub mod user;
